/// Formats the message used for internal assertion failures.
pub fn assertion_error(message: impl AsRef<str>) -> String {
    format!(
        "Drift plugin ({}) INTERNAL ASSERT FAILED: {}",
        env!("CARGO_PKG_VERSION"),
        message.as_ref()
    )
}
