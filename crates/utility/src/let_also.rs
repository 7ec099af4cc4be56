/// Kotlin-style scope functions for expression-shaped pipelines.
pub trait LetAlso: Sized {
    /// Pipes the value into `f` and returns whatever `f` returns.
    fn let_owned<R>(self, f: impl FnOnce(Self) -> R) -> R {
        f(self)
    }

    /// Runs `f` on a reference and hands the value back unchanged.
    fn also(self, f: impl FnOnce(&Self)) -> Self {
        f(&self);
        self
    }
}

impl<T> LetAlso for T {}
