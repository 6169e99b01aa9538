use core::fmt;

/// Wire encoding selected by content negotiation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    pub const JSON_MEDIA_TYPE: &'static str = "application/json";
    pub const XML_MEDIA_TYPE: &'static str = "application/xml";

    pub fn media_type(&self) -> &'static str {
        match self {
            Format::Json => Self::JSON_MEDIA_TYPE,
            Format::Xml => Self::XML_MEDIA_TYPE,
        }
    }

    /// Match a header value against the known media types.
    ///
    /// Parameters (`; charset=utf-8`) are ignored and the comparison is
    /// case-insensitive. Anything else yields `None`.
    pub fn from_media_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(Self::JSON_MEDIA_TYPE) {
            Some(Format::Json)
        } else if essence.eq_ignore_ascii_case(Self::XML_MEDIA_TYPE) {
            Some(Format::Xml)
        } else {
            None
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => f.write_str("JSON"),
            Format::Xml => f.write_str("XML"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_parameters_are_ignored() {
        assert_eq!(Format::from_media_type("application/xml"), Some(Format::Xml));
        assert_eq!(
            Format::from_media_type("Application/JSON; charset=utf-8"),
            Some(Format::Json)
        );
        assert_eq!(Format::from_media_type("text/plain"), None);
        assert_eq!(Format::from_media_type(""), None);
    }
}
