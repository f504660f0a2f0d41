//! Integration tests for types

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lockyard_types::*;
    use proptest::prelude::*;

    #[test]
    fn test_resource_serialization_skips_empty_state() {
        let resource = Resource::new("printer-1").with_capabilities(["printer", "color"]);
        let json = serde_json::to_string(&resource).unwrap();
        assert_eq!(
            json,
            r#"{"name":"printer-1","capabilities":["color","printer"]}"#
        );

        let back: Resource = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resource);
    }

    #[test]
    fn test_locked_resource_round_trips_owner() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut resource = Resource::new("r1");
        resource.lock(Requester::new("pipeline#3", started).with_context("branch-a"));

        let json = serde_json::to_string(&resource).unwrap();
        let back: Resource = serde_json::from_str(&json).unwrap();
        let owner = back.owner.unwrap();
        assert_eq!(owner.id.as_str(), "pipeline#3");
        assert_eq!(owner.context.as_str(), "branch-a");
        assert_eq!(owner.started_at, started);
    }

    #[test]
    fn test_request_display() {
        let request = ResourceRequest::new()
            .with_names(["a", "b"])
            .with_capability("gpu", 2)
            .with_group(RequirementGroup::all("printer"));
        assert_eq!(
            request.to_string(),
            "{[a, b], 2 of 'gpu', all of 'printer'}"
        );
    }

    #[test]
    fn test_precedence_serialization() {
        let json = serde_json::to_string(&QueuePrecedence::NewestFirst).unwrap();
        assert_eq!(json, r#""newest_first""#);
    }

    proptest! {
        #[test]
        fn parsed_capabilities_are_clean(raw in "[a-z0-9, \t]{0,40}") {
            let caps = Resource::parse_capabilities(&raw);
            for tag in &caps {
                prop_assert!(!tag.is_empty());
                prop_assert!(!tag.contains(',') && !tag.contains(char::is_whitespace));
            }
            let joined: Vec<&str> = caps.iter().map(String::as_str).collect();
            prop_assert_eq!(Resource::parse_capabilities(&joined.join(" ")), caps);
        }
    }
}
