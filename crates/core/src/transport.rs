use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::error::ClientResult;
use crate::protocol::HttpReply;

/// Moves one JSON body to a backend path and hands back the raw reply.
///
/// Futures are not `Send`: the browser host drives them on the UI thread.
pub trait Transport {
    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: String,
    ) -> LocalBoxFuture<'a, ClientResult<HttpReply>>;
}

impl<T> Transport for Rc<T>
where
    T: Transport + ?Sized,
{
    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: String,
    ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
        (**self).post_json(path, body)
    }
}

impl<T> Transport for &T
where
    T: Transport + ?Sized,
{
    fn post_json<'a>(
        &'a self,
        path: &'a str,
        body: String,
    ) -> LocalBoxFuture<'a, ClientResult<HttpReply>> {
        (**self).post_json(path, body)
    }
}
