use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::{Result, SignedRequest};

/// Response with a body that is read lazily; reading may still fail.
pub type Response = http::Response<Box<dyn Read + Send>>;

/// Sends a fully formed request.
///
/// Implementations do not retry or follow redirects on behalf of the
/// handshake, and surface their own timeouts as errors.
pub trait Transport {
    fn send(&self, request: SignedRequest) -> Result<Response>;
}

impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    fn send(&self, request: SignedRequest) -> Result<Response> {
        (**self).send(request)
    }
}

#[cfg(feature = "blocking")]
impl Transport for reqwest::blocking::Client {
    fn send(&self, request: SignedRequest) -> Result<Response> {
        let SignedRequest {
            method,
            url,
            headers,
            body,
        } = request;
        let mut builder = self.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let resp = builder.send()?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let mut response: Response = http::Response::new(Box::new(resp));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Drains the response body into a string.
pub fn read_body(response: Response) -> Result<String> {
    let mut body = String::new();
    response.into_body().read_to_string(&mut body)?;
    Ok(body)
}

/// Runs `send` on its own thread and hands the outcome to `callback`.
///
/// Concurrent dispatches complete in no particular order.
pub fn send_async<T, F>(transport: Arc<T>, request: SignedRequest, callback: F) -> JoinHandle<()>
where
    T: Transport + Send + Sync + ?Sized + 'static,
    F: FnOnce(Result<Response>) + Send + 'static,
{
    thread::spawn(move || callback(transport.send(request)))
}


#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use http::{Method, StatusCode};
    use url::Url;

    use super::mock::{MockTransport, Reply};
    use super::*;
    use crate::Error;

    fn request() -> SignedRequest {
        SignedRequest {
            method: Method::GET,
            url: Url::parse("http://example.com/").unwrap(),
            headers: Default::default(),
            body: None,
        }
    }

    #[test]
    fn read_body_collects_text() {
        let transport = MockTransport::new().ok("oauth_token=a&oauth_token_secret=b");
        let response = transport.send(request()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).unwrap(), "oauth_token=a&oauth_token_secret=b");
    }

    #[test]
    fn body_read_failures_are_io_errors() {
        let transport = MockTransport::new().reply(Reply::BrokenBody);
        let response = transport.send(request()).unwrap();
        assert!(matches!(read_body(response), Err(Error::BodyRead(_))));
    }

    #[test]
    fn async_dispatch_invokes_callback() {
        let transport = Arc::new(MockTransport::new().ok("done"));
        let (tx, rx) = mpsc::channel();
        let handle = send_async(Arc::clone(&transport), request(), move |result| {
            let body = result.and_then(read_body);
            tx.send(body.map_err(|e| e.to_string())).unwrap();
        });
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), Ok("done".to_string()));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn async_dispatch_reports_transport_errors() {
        let transport = Arc::new(MockTransport::new().reply(Reply::Fail(std::io::ErrorKind::TimedOut)));
        let (tx, rx) = mpsc::channel();
        send_async(transport, request(), move |result| {
            tx.send(matches!(result, Err(Error::Transport(_)))).unwrap();
        })
        .join()
        .unwrap();
        assert!(rx.recv().unwrap());
    }
}
