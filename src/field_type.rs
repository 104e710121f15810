/// How the sort key of a line is interpreted for comparison.
///
/// Derived from the active [Config](crate::config::Config): human size takes priority over
/// month, month over integer. When none of them is enabled the key is compared as a string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// Byte-wise lexicographic comparison
    String,
    /// Signed 64 bit integer
    Integer,
    /// Magnitude with an optional binary unit suffix, e.g. `1.5M`
    HumanSize,
    /// Three letter month abbreviation, e.g. `Mar`
    Month,
}
