//! Field capture for the modal forms. The surface hands over a flat
//! name -> value map; everything typed is built here.
use crate::error::{ConsoleError, ConsoleResult};
use crate::models::{MoviePayload, UserPayload};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    values: BTreeMap<String, String>,
}

impl FormFields {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed value; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    }

    /// Checkbox semantics: present and not an explicit "off"/"false".
    pub fn checked(&self, name: &str) -> bool {
        match self.text(name) {
            Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "off" | "false" | "0"),
            None => false,
        }
    }

    fn number<T: FromStr>(&self, name: &str, label: &str) -> ConsoleResult<Option<T>> {
        match self.text(name) {
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| ConsoleError::Validation(format!("{} must be a number", label))),
            None => Ok(None),
        }
    }
}

pub fn movie_payload(fields: &FormFields) -> ConsoleResult<MoviePayload> {
    let title = fields
        .text("title")
        .ok_or_else(|| ConsoleError::Validation("Title is required".into()))?;
    let year = fields.number::<i32>("year", "Year")?;
    let rating = fields.number::<f64>("rating", "Rating")?;
    if let Some(r) = rating {
        if !(0.0..=10.0).contains(&r) {
            return Err(ConsoleError::Validation(
                "Rating must be between 0 and 10".into(),
            ));
        }
    }
    let runtime = fields.number::<u32>("runtime", "Runtime")?;
    let genres = fields
        .text("genres")
        .map(|g| {
            g.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    Ok(MoviePayload {
        title,
        year,
        genres,
        rating,
        runtime,
        director: fields.text("director"),
        plot: fields.text("plot"),
        poster_url: fields.text("posterUrl"),
    })
}

pub fn user_payload(fields: &FormFields) -> ConsoleResult<UserPayload> {
    let name = fields
        .text("name")
        .ok_or_else(|| ConsoleError::Validation("Name is required".into()))?;
    Ok(UserPayload {
        name,
        is_admin: fields.checked("isAdmin"),
        is_active: fields.checked("isActive"),
    })
}
