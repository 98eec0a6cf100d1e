use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::session::MemorySession;

/// 池中的会话。请求在整个处理过程中持有它的锁，同一会话的并发请求因此按顺序执行。
pub type SharedSession = Arc<Mutex<MemorySession>>;

/// 宿主服务器的会话池，容量满时淘汰最久未使用的会话
pub struct SessionPool {
    sessions: LruCache<String, SharedSession>,
}

impl SessionPool {
    // 根据容量构造
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = match NonZeroUsize::new(capacity) {
            Some(c) => c,
            None => panic!("调用from_capacity时指定的大小是0。如果需要自动设置大小，请在调用处进行处理，而不是传入0"),
        };
        Self {
            sessions: LruCache::new(capacity),
        }
    }

    /// 取出已知 id 的会话。池中没有的 id（伪造的或已被淘汰的）返回 `None`。
    pub fn checkout(&mut self, id: &str) -> Option<SharedSession> {
        self.sessions.get(id).map(Arc::clone)
    }

    /// 以随机 id 新建一个空会话并放入池中
    pub fn create(&mut self) -> (String, SharedSession) {
        let id = Uuid::new_v4().simple().to_string();
        let session = SharedSession::default();
        self.sessions.put(id.clone(), Arc::clone(&session));
        (id, session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // 测试
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.sessions.cap().get()
    }
}
