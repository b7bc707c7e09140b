// Page fetching: the HTTP side of analysis.
//
// PageFetcher is the seam between the analyzer and the network. The
// production implementation is a thin reqwest wrapper; tests swap in
// fetchers that serve canned HTML.

pub mod client;
pub mod rate_limiter;
pub mod traits;
