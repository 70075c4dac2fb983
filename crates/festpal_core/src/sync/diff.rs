//! Field-by-field diff between two versions of a record.

use crate::model::changed;
use crate::model::concert::{Concert, ConcertPatch};
use crate::model::festival::{Festival, FestivalPatch};

/// Builds a patch holding exactly the fields of `to` that differ from `from`.
///
/// Local ids and timestamps are never part of the diff; an external id is
/// carried only when `to` has one.
pub fn festival_patch(from: &Festival, to: &Festival) -> FestivalPatch {
    FestivalPatch {
        external_id: to.external_id.filter(|_| from.external_id != to.external_id),
        name: changed(&from.name, &to.name),
        description: changed(&from.description, &to.description),
        country: changed(&from.country, &to.country),
        city: changed(&from.city, &to.city),
        address: changed(&from.address, &to.address),
        genre: changed(&from.genre, &to.genre),
        prices: changed(&from.prices, &to.prices),
        owner: changed(&from.owner, &to.owner),
        official: changed(&from.official, &to.official),
        votes: changed(&from.votes, &to.votes),
        last_modified_ms: None,
        last_synchronised_ms: None,
    }
}

/// Concert analogue of [`festival_patch`]; includes `festival_id` and `notify`.
pub fn concert_patch(from: &Concert, to: &Concert) -> ConcertPatch {
    ConcertPatch {
        external_id: to.external_id.filter(|_| from.external_id != to.external_id),
        festival_id: changed(&from.festival_id, &to.festival_id),
        artist: changed(&from.artist, &to.artist),
        stage: changed(&from.stage, &to.stage),
        day: changed(&from.day, &to.day),
        start_ms: changed(&from.start_ms, &to.start_ms),
        end_ms: changed(&from.end_ms, &to.end_ms),
        notify: changed(&from.notify, &to.notify),
        last_modified_ms: None,
        last_synchronised_ms: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{concert_patch, festival_patch};
    use crate::model::concert::Concert;
    use crate::model::festival::Festival;

    #[test]
    fn identical_records_produce_empty_patch() {
        let festival = Festival::new("Exit", "ivan");
        assert!(festival_patch(&festival, &festival.clone()).is_empty());

        let concert = Concert::new(1, "Band", 1, 1, 10, 20);
        assert!(concert_patch(&concert, &concert.clone()).is_empty());
    }

    #[test]
    fn festival_patch_holds_only_changed_fields() {
        let from = Festival::new("Exit", "ivan");
        let mut to = from.clone();
        to.city = "Novi Sad".to_string();
        to.votes = 12;
        to.last_modified_ms += 1_000;

        let patch = festival_patch(&from, &to);
        assert_eq!(patch.city.as_deref(), Some("Novi Sad"));
        assert_eq!(patch.votes, Some(12));
        assert!(patch.name.is_none());
        assert!(patch.official.is_none());
        assert!(patch.last_modified_ms.is_none());

        let mut applied = from.clone();
        assert!(patch.apply_to(&mut applied));
        assert!(applied.sync_eq(&to));
    }

    #[test]
    fn external_id_is_carried_only_when_target_has_one() {
        let mut published = Festival::new("Exit", "ivan");
        published.external_id = Some(7);
        let unpublished = Festival::new("Exit", "ivan");

        assert_eq!(festival_patch(&unpublished, &published).external_id, Some(7));
        assert_eq!(festival_patch(&published, &unpublished).external_id, None);
    }

    #[test]
    fn concert_patch_tracks_schedule_and_notify() {
        let from = Concert::new(1, "Band", 1, 1, 10, 20);
        let mut to = from.clone();
        to.end_ms = 30;
        to.notify = true;

        let patch = concert_patch(&from, &to);
        assert_eq!(patch.end_ms, Some(30));
        assert_eq!(patch.notify, Some(true));
        assert!(patch.start_ms.is_none());
        assert!(patch.festival_id.is_none());
    }
}
