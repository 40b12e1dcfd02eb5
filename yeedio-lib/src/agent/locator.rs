//! Selection of the media element to manage.

use std::sync::Arc;

use crate::host::{Document, MediaElement, ReadyState};

/// Pick the most relevant media element in `document`.
///
/// Playing elements win over paused ones; within a group the largest rendered
/// area wins, and the first element in tree order wins ties.
pub fn locate(document: &dyn Document) -> Option<Arc<dyn MediaElement>> {
    let elements = document.media_elements();

    let playing = largest(elements.iter().filter(|element| is_playing(element.as_ref())));
    playing.or_else(|| largest(elements.iter()))
}

/// Not paused, not ended, and buffered past the current frame.
pub fn is_playing(element: &dyn MediaElement) -> bool {
    !element.is_paused()
        && !element.is_ended()
        && element.ready_state() > ReadyState::HaveCurrentData
}

fn largest<'a, I>(elements: I) -> Option<Arc<dyn MediaElement>>
where
    I: Iterator<Item = &'a Arc<dyn MediaElement>>,
{
    elements
        .fold(None::<&Arc<dyn MediaElement>>, |best, element| match best {
            Some(best) if element.client_size().area() <= best.client_size().area() => Some(best),
            _ => Some(element),
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{SimDocument, VideoSpec};
    use crate::timing::Scheduler;

    fn document() -> Arc<SimDocument> {
        SimDocument::new(&Scheduler::new())
    }

    #[test]
    fn empty_document_has_no_target() {
        assert!(locate(document().as_ref()).is_none());
    }

    #[test]
    fn playing_small_beats_paused_large() {
        let document = document();
        let small = document.preload(&VideoSpec::sized(320, 180).playing());
        document.preload(&VideoSpec::sized(1920, 1080));

        let target = locate(document.as_ref()).expect("target");
        assert_eq!(target.id(), small.id());
    }

    #[test]
    fn larger_of_two_playing_wins() {
        let document = document();
        document.preload(&VideoSpec::sized(640, 360).playing());
        let large = document.preload(&VideoSpec::sized(1280, 720).playing());

        let target = locate(document.as_ref()).expect("target");
        assert_eq!(target.id(), large.id());
    }

    #[test]
    fn largest_paused_is_fallback() {
        let document = document();
        document.preload(&VideoSpec::sized(640, 360));
        let large = document.preload(&VideoSpec::sized(854, 480));
        document.preload(&VideoSpec::sized(320, 240).playing().ended());

        let target = locate(document.as_ref()).expect("target");
        assert_eq!(target.id(), large.id());
    }

    #[test]
    fn ties_keep_first_in_tree_order() {
        let document = document();
        let first = document.preload(&VideoSpec::sized(640, 360).playing());
        document.preload(&VideoSpec::sized(640, 360).playing());

        let target = locate(document.as_ref()).expect("target");
        assert_eq!(target.id(), first.id());
    }

    #[test]
    fn unbuffered_playing_element_is_not_playing() {
        let document = document();
        let buffering = document.preload(
            &VideoSpec::sized(1920, 1080)
                .playing()
                .with_ready_state(ReadyState::HaveCurrentData),
        );
        let small = document.preload(&VideoSpec::sized(320, 180).playing());

        assert!(!is_playing(buffering.as_ref()));
        let target = locate(document.as_ref()).expect("target");
        assert_eq!(target.id(), small.id());
    }
}
