use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors that abort schedule parsing. Unknown elements and unrecognized
/// track types are tolerated and never surface here.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("xml syntax error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("attribute `{attribute}` on <{element}> has invalid value `{value}`")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    #[error("`{0}` does not denote a valid local time")]
    InvalidTime(String),

    #[error("unexpected end of document inside an open element")]
    UnexpectedDocumentEnd,
}
