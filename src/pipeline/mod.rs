// Analysis tasks built on the analyzer and the store.
//
// analyze     analyze one URL for one publisher and save the result
// visits      fold a day of served-ad views into per-URL visit counters
// reanalyze   re-run analysis on busy URLs whose results are getting old
// similar     rank stored URLs by embedding distance to a page

pub mod analyze;
pub mod reanalyze;
pub mod similar;
pub mod visits;
