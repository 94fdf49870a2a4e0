//! Extraction and removal of venue-shaped fields from an event record.
//! Venue data travels in its own channel; once extracted it is stripped
//! from the event body before the unit leaves the adapter.

use crate::types::{StandardizedEvent, VenueMetadata};

fn non_empty(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Pulls the venue-* fields out of an event into a separate metadata
/// object. Empty fields become `None` (absence means unknown).
pub fn extract_venue_metadata(event: &StandardizedEvent) -> VenueMetadata {
    VenueMetadata {
        name: non_empty(&event.venue),
        address: non_empty(&event.venue_address),
        city: non_empty(&event.venue_city),
        state: non_empty(&event.venue_state),
        zip: non_empty(&event.venue_zip),
        country: non_empty(&event.venue_country),
        phone: non_empty(&event.venue_phone),
        website: non_empty(&event.venue_website),
        coordinates: non_empty(&event.venue_coordinates),
        capacity: None,
    }
}

/// Removes all venue fields from the event body.
pub fn strip_venue_metadata(event: &mut StandardizedEvent) {
    event.venue.clear();
    event.venue_address.clear();
    event.venue_city.clear();
    event.venue_state.clear();
    event.venue_zip.clear();
    event.venue_country.clear();
    event.venue_phone.clear();
    event.venue_website.clear();
    event.venue_coordinates.clear();
}

/// Writes venue metadata back onto an event, the inverse of the
/// extract/strip pair.
pub fn merge_venue_metadata(event: &mut StandardizedEvent, venue: &VenueMetadata) {
    if let Some(v) = &venue.name {
        event.venue = v.clone();
    }
    if let Some(v) = &venue.address {
        event.venue_address = v.clone();
    }
    if let Some(v) = &venue.city {
        event.venue_city = v.clone();
    }
    if let Some(v) = &venue.state {
        event.venue_state = v.clone();
    }
    if let Some(v) = &venue.zip {
        event.venue_zip = v.clone();
    }
    if let Some(v) = &venue.country {
        event.venue_country = v.clone();
    }
    if let Some(v) = &venue.phone {
        event.venue_phone = v.clone();
    }
    if let Some(v) = &venue.website {
        event.venue_website = v.clone();
    }
    if let Some(v) = &venue.coordinates {
        event.venue_coordinates = v.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn venue_event() -> StandardizedEvent {
        StandardizedEvent {
            title: "Jazz Night".to_string(),
            venue: "Blue Room".to_string(),
            venue_address: "123 Pine St".to_string(),
            venue_city: "Seattle".to_string(),
            venue_state: "WA".to_string(),
            venue_zip: "98101".to_string(),
            venue_country: "US".to_string(),
            venue_phone: "206-555-0100".to_string(),
            venue_website: "https://blueroom.example".to_string(),
            venue_coordinates: "47.6,-122.3".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_fields_are_dropped_not_carried_as_empty_strings() {
        let event = StandardizedEvent {
            venue: "Blue Room".to_string(),
            venue_city: "  ".to_string(),
            ..Default::default()
        };
        let meta = extract_venue_metadata(&event);
        assert_eq!(meta.name.as_deref(), Some("Blue Room"));
        assert!(meta.city.is_none());
        assert!(meta.address.is_none());
    }

    #[test]
    fn strip_then_merge_reconstructs_the_original() {
        let original = venue_event();
        let meta = extract_venue_metadata(&original);

        let mut event = original.clone();
        strip_venue_metadata(&mut event);
        assert!(event.venue.is_empty());
        assert!(event.venue_coordinates.is_empty());
        assert_eq!(event.title, original.title);

        merge_venue_metadata(&mut event, &meta);
        assert_eq!(event, original);
    }

    #[test]
    fn fully_empty_event_yields_empty_metadata() {
        let meta = extract_venue_metadata(&StandardizedEvent::default());
        assert!(meta.is_empty());
    }
}
