use anyhow::Result;

/// A conversion applied to each raw item when it is read from a
/// [`LazyDataset`](crate::dataset::LazyDataset), e.g. decoding a file name
/// into pixels or a string into token ids.
pub trait Transform<I, O>: Send + Sync {
    fn apply(&self, input: I) -> Result<O>;
}

impl<I, O, F> Transform<I, O> for F
where
    F: Fn(I) -> Result<O> + Send + Sync,
{
    fn apply(&self, input: I) -> Result<O> {
        self(input)
    }
}
