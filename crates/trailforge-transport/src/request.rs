//! The connect request carried on the WebSocket upgrade URL.
//!
//! Browsers can't set headers on a WebSocket upgrade, so everything the
//! server needs to seat a player travels in the query string:
//!
//! ```text
//! ws://host:8080/?name=Ada&room=k3x9qa&password=oxen&session=5f2c...
//! ```

use trailforge_protocol::RoomId;

/// What the client asked for when it connected.
///
/// Every field is optional at this layer. Empty values count as absent.
/// Deciding what a missing name or room means is the server's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub name: Option<String>,
    pub room: Option<RoomId>,
    pub password: Option<String>,
    /// A session token from an earlier `welcome`.
    pub session: Option<String>,
}

impl ConnectRequest {
    /// Parses an `application/x-www-form-urlencoded` query string.
    /// Unknown keys are ignored; a repeated key keeps its last value.
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "name" => request.name = Some(value),
                "room" => request.room = Some(RoomId(value)),
                "password" => request.password = Some(value),
                "session" => request.session = Some(value),
                _ => {}
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query_reads_every_field() {
        let req = ConnectRequest::from_query("name=Ada&room=k3x9qa&password=oxen&session=abc123");

        assert_eq!(req.name.as_deref(), Some("Ada"));
        assert_eq!(req.room, Some(RoomId::from("k3x9qa")));
        assert_eq!(req.password.as_deref(), Some("oxen"));
        assert_eq!(req.session.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_from_query_decodes_percent_and_plus() {
        let req = ConnectRequest::from_query("name=Mary+Ann%20Jones");
        assert_eq!(req.name.as_deref(), Some("Mary Ann Jones"));
    }

    #[test]
    fn test_from_query_empty_values_are_absent() {
        let req = ConnectRequest::from_query("name=Bo&room=&password=");

        assert_eq!(req.name.as_deref(), Some("Bo"));
        assert_eq!(req.room, None);
        assert_eq!(req.password, None);
    }

    #[test]
    fn test_from_query_ignores_unknown_keys() {
        let req = ConnectRequest::from_query("color=blue&name=Cy");
        assert_eq!(
            req,
            ConnectRequest {
                name: Some("Cy".into()),
                ..ConnectRequest::default()
            }
        );
    }

    #[test]
    fn test_from_query_empty_string_is_default() {
        assert_eq!(ConnectRequest::from_query(""), ConnectRequest::default());
    }
}
