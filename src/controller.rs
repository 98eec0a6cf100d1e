use crate::{request::Request, response::Response, session::Session};

/// 一次请求的处理上下文：请求、待发送的响应以及该用户的会话。
pub struct Controller<'s> {
    request: Request,
    response: Response,
    session: &'s mut dyn Session,
}

impl<'s> Controller<'s> {
    pub fn new(request: Request, session: &'s mut dyn Session) -> Self {
        Self {
            request,
            response: Response::new(),
            session,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// 替换控制器持有的响应
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    pub fn session(&self) -> &(dyn Session + 's) {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut (dyn Session + 's) {
        &mut *self.session
    }
}

/// 渲染前事件，主体是当前请求的控制器
pub struct RenderEvent<'e, 's> {
    subject: &'e mut Controller<'s>,
}

impl<'e, 's> RenderEvent<'e, 's> {
    pub fn new(subject: &'e mut Controller<'s>) -> Self {
        Self { subject }
    }

    pub fn subject(&mut self) -> &mut Controller<'s> {
        &mut *self.subject
    }
}
