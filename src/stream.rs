//! Async counterpart of [`RouteIter`](crate::route::RouteIter)
//!
//! Hops are produced as a [`Stream`]. Between two polls the consumer is free
//! to await anything (a confirmation, a price refresh); no relaxation is in
//! progress at that point.

use futures::stream::{self, Stream};
use petgraph::graph::NodeIndex;

use crate::algebra::AsyncLabelAlgebra;
use crate::config::RouteConfig;
use crate::error::{LookupError, RouteError};
use crate::graph::{Hop, RouteGraph};
use crate::route::Route;

impl<N, D> RouteGraph<N, D> {
    /// Stream of hops from `source` to `destination`. The stream ends once
    /// the destination is reached or right after the first error.
    pub fn route_stream<'g, A>(
        &'g self,
        source: NodeIndex,
        destination: NodeIndex,
        start: A::Label,
        algebra: A,
        config: RouteConfig,
    ) -> Result<impl Stream<Item = Result<Hop<'g, N, D, A::Label>, RouteError>> + 'g, LookupError>
    where
        A: AsyncLabelAlgebra<N, D> + 'g,
        A::Label: 'g,
        N: 'g,
        D: 'g,
    {
        let route = Route::new(self, source, destination, start, config)?;

        Ok(stream::unfold((route, algebra), move |(mut route, algebra)| async move {
            match route.advance_async(self, &algebra).await {
                Ok(Some(hop)) => Some((Ok(hop), (route, algebra))),
                Ok(None) => None,
                // The route is now failed, so the following poll ends the stream
                Err(err) => Some((Err(err), (route, algebra))),
            }
        }))
    }
}
