use std::fmt;

/// リスナー登録トークン
///
/// 購読時に返され、購読解除に使用します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// イベントリスナーの登録簿
///
/// イベントを発行するエンティティが所有するマルチキャストのリスナーリストです。
/// 購読と解除は明示的に行い、エンティティ破棄時には `clear` で全解除します。
pub struct EventListeners<E> {
    listeners: Vec<(ListenerId, Box<dyn FnMut(&E)>)>,
    next_id: u64,
}

impl<E> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// リスナーを登録
    ///
    /// # 戻り値
    ///
    /// 購読解除に使用するトークン
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&E) + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// リスナーを解除
    ///
    /// # 戻り値
    ///
    /// 登録されていたリスナーを削除した場合はtrue
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// 登録順に全リスナーへイベントを通知
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    /// 全リスナーを解除
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
