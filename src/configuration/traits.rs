use miette::Result;

/// An unvalidated configuration table that can be turned into its validated form.
pub trait ResolvableConfiguration {
    type Resolved;

    /// Validate the table and convert it into `Resolved`.
    /// Returns `Err` if any field holds an unusable value.
    fn resolve(self) -> Result<Self::Resolved>;
}


/// An unvalidated configuration table whose validation needs values
/// from an already-resolved table (e.g. base paths for placeholder expansion).
pub trait ResolvableConfigurationWithContext {
    type Context;
    type Resolved;

    /// Validate the table using `context` and convert it into `Resolved`.
    /// Returns `Err` if any field holds an unusable value.
    fn resolve(self, context: Self::Context) -> Result<Self::Resolved>;
}
