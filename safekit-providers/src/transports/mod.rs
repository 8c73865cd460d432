mod common;
pub use common::{JsonRpcError, Request, Response, ResponseData};

mod http;
pub use http::{ClientError, Http};

mod mock;
pub use mock::{MockError, MockProvider, MockResponse};
