//! EPIC archive image URL builder. Pure computation, no upstream call.

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use super::error::RequestError;
use super::request::{Endpoints, present};

const DEFAULT_IMAGE_TYPE: &str = "natural";

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct EpicImageQuery {
    pub image: Option<String>,
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpicImageUrl {
    pub url: String,
}

/// Build `<archive>/<type>/<yyyy>/<mm>/<dd>/png/<image>.png`.
pub fn image_url(endpoints: &Endpoints, query: &EpicImageQuery) -> Result<EpicImageUrl, RequestError> {
    let (Some(image), Some(raw_date)) = (present(&query.image), present(&query.date)) else {
        return Err(RequestError::Missing("image and date are required"));
    };
    let kind = present(&query.kind).unwrap_or(DEFAULT_IMAGE_TYPE);
    let date = parse_day(raw_date)?;

    let year = format!("{:04}", date.year());
    let month = format!("{:02}", u8::from(date.month()));
    let day = format!("{:02}", date.day());
    let file = format!("{image}.png");

    let url = endpoints.epic_archive(&[kind, &year, &month, &day, "png", &file]);
    Ok(EpicImageUrl {
        url: url.to_string(),
    })
}

/// Accept a calendar date or an RFC 3339 timestamp; timestamps resolve to their UTC day.
fn parse_day(raw: &str) -> Result<Date, RequestError> {
    let calendar = format_description!("[year]-[month]-[day]");
    if let Ok(date) = Date::parse(raw, calendar) {
        return Ok(date);
    }

    OffsetDateTime::parse(raw, &Rfc3339)
        .map(|timestamp| timestamp.to_offset(UtcOffset::UTC).date())
        .map_err(|_| {
            RequestError::invalid("date", format!("`{raw}` is not a YYYY-MM-DD date or RFC 3339 timestamp"))
        })
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;

    fn endpoints() -> Endpoints {
        Endpoints {
            api_base: Url::parse("https://api.nasa.gov").expect("url"),
            images_base: Url::parse("https://images-api.nasa.gov").expect("url"),
            epic_archive_base: Url::parse("https://epic.gsfc.nasa.gov/archive").expect("url"),
            api_key: String::new(),
        }
    }

    fn query(image: Option<&str>, date: Option<&str>, kind: Option<&str>) -> EpicImageQuery {
        EpicImageQuery {
            image: image.map(str::to_string),
            date: date.map(str::to_string),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn pads_month_and_day_and_defaults_type() {
        let built = image_url(&endpoints(), &query(Some("abc"), Some("2021-03-04"), None))
            .expect("valid input");
        assert_eq!(
            built.url,
            "https://epic.gsfc.nasa.gov/archive/natural/2021/03/04/png/abc.png"
        );
    }

    #[test]
    fn honours_explicit_type() {
        let built = image_url(
            &endpoints(),
            &query(Some("epic_RGB_20211231"), Some("2021-12-31"), Some("enhanced")),
        )
        .expect("valid input");
        assert_eq!(
            built.url,
            "https://epic.gsfc.nasa.gov/archive/enhanced/2021/12/31/png/epic_RGB_20211231.png"
        );
    }

    #[test]
    fn timestamps_use_utc_day() {
        let built = image_url(
            &endpoints(),
            &query(Some("abc"), Some("2021-03-04T23:30:00-02:00"), None),
        )
        .expect("valid input");
        assert!(built.url.contains("/2021/03/05/"), "got {}", built.url);
    }

    #[test]
    fn missing_image_or_date_is_rejected() {
        for input in [
            query(None, Some("2021-03-04"), None),
            query(Some("abc"), None, None),
            query(Some(""), Some("2021-03-04"), None),
        ] {
            assert_eq!(
                image_url(&endpoints(), &input),
                Err(RequestError::Missing("image and date are required"))
            );
        }
    }

    #[test]
    fn garbage_date_is_rejected() {
        let err = image_url(&endpoints(), &query(Some("abc"), Some("yesterday"), None))
            .expect_err("invalid date");
        assert!(matches!(err, RequestError::Invalid { field: "date", .. }));
    }
}
