use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Collapsed,
}

impl Visibility {
    #[must_use]
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Converter parameter {0:?} is not a valid boolean")]
    InvalidParameter(String),

    #[error("Converting visibility back to a boolean is not supported")]
    Unsupported,
}

/// Maps a bound boolean to a [`Visibility`].
///
/// A missing or `false` value collapses the element. A parameter of
/// `"true"` inverts the mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanToVisibility;

impl BooleanToVisibility {
    pub fn convert(
        self,
        value: Option<bool>,
        parameter: Option<&str>,
    ) -> Result<Visibility, ConvertError> {
        let invert = match parameter {
            Some(raw) => parse_bool(raw)?,
            None => false,
        };
        let collapsed = !value.unwrap_or(false) ^ invert;

        Ok(if collapsed {
            Visibility::Collapsed
        } else {
            Visibility::Visible
        })
    }

    pub fn convert_back(
        self,
        _value: Visibility,
        _parameter: Option<&str>,
    ) -> Result<bool, ConvertError> {
        Err(ConvertError::Unsupported)
    }
}

fn parse_bool(raw: &str) -> Result<bool, ConvertError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(ConvertError::InvalidParameter(raw.to_string()))
    }
}
