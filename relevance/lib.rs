/*!
This crate scores how well each column separates a foreground set of rows, usually the selection, from a background set, usually the filtered rows. Scores are Bhattacharyya distances between binned value distributions, normalized so the most distinguishing column scores 1.

[`compute_relevance`](fn.compute_relevance.html) is a pure function of a self-contained [`RelevanceInput`](struct.RelevanceInput.html), so it can run on the [`RelevanceWorker`](struct.RelevanceWorker.html) thread without any synchronization.
*/

#![allow(clippy::tabs_in_doc_comments)]

mod compute;
mod worker;

pub use self::compute::{compute_relevance, Relevances, RelevanceInput, DEFAULT_RELEVANCE_BINS};
pub use self::worker::{RelevanceError, RelevanceWorker};
