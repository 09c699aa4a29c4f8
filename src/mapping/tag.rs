use std::fmt;
use std::str::FromStr;

/// Destination shape a raw parameter value is coerced into.
///
/// Every variant is handled by [`super::coerce::coerce`]; the names returned by
/// [`TypeTag::name`] are the ones accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Plain string
    Str,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Int64,
    /// 64-bit float
    Float,
    /// Boolean
    Bool,
    /// Boolean wrapped in a `{"Value": ...}` attribute object
    BoolAttribute,
    /// String wrapped in a `{"Value": ...}` attribute object
    StringAttribute,
    /// List of strings
    StringSlice,
    /// List of 64-bit integers
    Int64Slice,
    /// String-keyed map of strings, from an object or `key:value` items
    StringPointerMap,
    /// Comma-joined string
    CsvString,
    /// Integer rendered as six zero-padded digits
    SixDigitString,
    /// Raw bytes of the string value
    ByteSlice,
    /// Base64 encoding of the string value itself
    Base64String,
    /// RFC 3339 timestamp
    Timestamp,
    /// Any JSON value passed through untouched
    Json,
    /// File or URL content, base64-encoded
    FileToBase64,
    /// File or URL content as raw bytes
    FileToBytes,
    /// File or URL content as a string
    FileToString,
    /// User-data script (file, URL or inline `#` text), template-rendered then base64-encoded
    UserDataToBase64,
    /// Template file or URL rendered to a string
    TemplateToString,
    /// `name:value` items into `[{"Name","Value"}]`
    Dimensions,
    /// `key:value` items into `[{"Key","Value"}]`
    Tags,
    /// `key:value` items into `[{"ParameterKey","ParameterValue"}]`
    StackParameters,
    /// `[host:]container[/tcp|udp]` items into port mapping objects
    PortMappings,
    /// `lower:upper:adjustment` items into step adjustment objects
    StepAdjustments,
    /// `subnet[:allocation]` items into subnet mapping objects
    SubnetMappings,
}

impl TypeTag {
    pub const ALL: [TypeTag; 27] = [
        TypeTag::Str,
        TypeTag::Int,
        TypeTag::Int64,
        TypeTag::Float,
        TypeTag::Bool,
        TypeTag::BoolAttribute,
        TypeTag::StringAttribute,
        TypeTag::StringSlice,
        TypeTag::Int64Slice,
        TypeTag::StringPointerMap,
        TypeTag::CsvString,
        TypeTag::SixDigitString,
        TypeTag::ByteSlice,
        TypeTag::Base64String,
        TypeTag::Timestamp,
        TypeTag::Json,
        TypeTag::FileToBase64,
        TypeTag::FileToBytes,
        TypeTag::FileToString,
        TypeTag::UserDataToBase64,
        TypeTag::TemplateToString,
        TypeTag::Dimensions,
        TypeTag::Tags,
        TypeTag::StackParameters,
        TypeTag::PortMappings,
        TypeTag::StepAdjustments,
        TypeTag::SubnetMappings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Str => "string",
            TypeTag::Int => "int",
            TypeTag::Int64 => "int64",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::BoolAttribute => "bool-attribute",
            TypeTag::StringAttribute => "string-attribute",
            TypeTag::StringSlice => "string-slice",
            TypeTag::Int64Slice => "int64-slice",
            TypeTag::StringPointerMap => "string-pointer-map",
            TypeTag::CsvString => "csv-string",
            TypeTag::SixDigitString => "six-digit-string",
            TypeTag::ByteSlice => "byte-slice",
            TypeTag::Base64String => "base64-string",
            TypeTag::Timestamp => "timestamp",
            TypeTag::Json => "json",
            TypeTag::FileToBase64 => "file-to-base64",
            TypeTag::FileToBytes => "file-to-bytes",
            TypeTag::FileToString => "file-to-string",
            TypeTag::UserDataToBase64 => "userdata-to-base64",
            TypeTag::TemplateToString => "template-to-string",
            TypeTag::Dimensions => "dimensions",
            TypeTag::Tags => "tags",
            TypeTag::StackParameters => "stack-parameters",
            TypeTag::PortMappings => "port-mappings",
            TypeTag::StepAdjustments => "step-adjustments",
            TypeTag::SubnetMappings => "subnet-mappings",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = TypeTag::ALL.iter().map(|t| t.name()).collect();
                format!("unknown type tag '{}' (known: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tag_names_are_unique_and_parse_back() {
        let mut seen = HashSet::new();
        for tag in TypeTag::ALL {
            assert!(seen.insert(tag.name()), "duplicate name {}", tag.name());
            assert_eq!(tag.name().parse::<TypeTag>().unwrap(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_lists_known_names() {
        let err = "awsstr".parse::<TypeTag>().unwrap_err();
        assert!(err.contains("unknown type tag 'awsstr'"));
        assert!(err.contains("port-mappings"));
    }
}
