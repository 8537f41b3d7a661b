mod middleware;
mod public;
mod revalidate;

pub use middleware::RequestContext;
pub use public::{HttpState, build_router};
