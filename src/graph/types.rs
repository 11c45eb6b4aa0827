use petgraph::graph::EdgeIndex;
use serde::Deserialize;

/// Caller-facing view of a stored transaction (arc).
///
/// Endpoints and details borrow from the graph, so handing one to a label
/// algebra never clones caller data.
#[derive(Debug)]
pub struct Transaction<'g, N, D> {
    pub id: EdgeIndex,
    pub from: &'g N,
    pub to: &'g N,
    pub details: &'g D,
}

// Manual impls: derive would demand N: Clone and D: Clone
impl<N, D> Clone for Transaction<'_, N, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N, D> Copy for Transaction<'_, N, D> {}

impl<N: PartialEq, D: PartialEq> PartialEq for Transaction<'_, N, D> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.from == other.from
            && self.to == other.to
            && self.details == other.details
    }
}

/// Transaction naming its endpoints by node value, used as construction input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionSpec<N, D> {
    pub from: N,
    pub to: N,
    pub details: D,
}

impl<N, D> TransactionSpec<N, D> {
    pub fn new(from: N, to: N, details: D) -> Self {
        Self { from, to, details }
    }
}

/// One committed traversal: the transaction taken and the labels
/// `[before, after]` it
#[derive(Debug, Clone)]
pub struct Hop<'g, N, D, L> {
    pub arc: Transaction<'g, N, D>,
    pub labels: [L; 2],
}

impl<'g, N, D, L> Hop<'g, N, D, L> {
    pub fn label_before(&self) -> &L {
        &self.labels[0]
    }

    pub fn label_after(&self) -> &L {
        &self.labels[1]
    }

    pub fn from(&self) -> &'g N {
        self.arc.from
    }

    pub fn to(&self) -> &'g N {
        self.arc.to
    }

    pub fn details(&self) -> &'g D {
        self.arc.details
    }
}
