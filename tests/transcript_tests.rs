// Unit tests for transcript accumulation sequences.
//
// These walk the interim/final sequences a provider actually produces and
// verify the confirmed/pending split behaves as specified.

use duoscribe::{AccumulatedTranscript, Provider, TranscriptUnifier, UnifiedEvent};

#[test]
fn consecutive_interims_replace_each_other() {
    let mut acc = AccumulatedTranscript::new();

    acc.apply("foo", false);
    acc.apply("foobar", false);

    assert_eq!(acc.pending(), Some("foobar"));
    assert_eq!(acc.confirmed(), "");
}

#[test]
fn interim_then_final_leaves_no_pending_markers() {
    let mut acc = AccumulatedTranscript::new();

    acc.apply("previously confirmed", true);
    acc.apply("foo", false);
    acc.apply("foo bar", true);

    assert_eq!(acc.confirmed(), "previously confirmed foo bar");
    assert_eq!(acc.pending(), None);

    let annotated = acc.annotated();
    assert!(!annotated.contains("<interim>"));
    assert!(!annotated.contains("</interim>"));
}

#[test]
fn finals_append_with_single_space_separator() {
    let mut acc = AccumulatedTranscript::new();

    acc.apply("one", true);
    acc.apply("two", true);
    acc.apply("three", true);

    assert_eq!(acc.confirmed(), "one two three");
}

#[test]
fn interleaved_interims_track_the_growing_utterance() {
    let mut acc = AccumulatedTranscript::new();

    acc.apply("he", false);
    acc.apply("hello", false);
    acc.apply("hello wor", false);
    acc.apply("Hello world.", true);
    acc.apply("how", false);

    assert_eq!(acc.confirmed(), "Hello world.");
    assert_eq!(acc.pending(), Some("how"));
    assert_eq!(acc.annotated(), "Hello world. <interim>how</interim>");
}

#[test]
fn per_provider_ordering_is_independent() {
    let mut unifier = TranscriptUnifier::new();

    // Events from the two providers interleave arbitrarily; each buffer only
    // sees its own stream's order.
    unifier.apply(Provider::Deepgram, &UnifiedEvent::transcript("a", false));
    unifier.apply(Provider::AssemblyAi, &UnifiedEvent::transcript("x", false));
    unifier.apply(Provider::Deepgram, &UnifiedEvent::transcript("a b", true));
    unifier.apply(Provider::AssemblyAi, &UnifiedEvent::transcript("x y", false));
    unifier.apply(Provider::Deepgram, &UnifiedEvent::transcript("c", false));
    unifier.apply(Provider::AssemblyAi, &UnifiedEvent::transcript("x y z", true));

    let deepgram = unifier.transcript(Provider::Deepgram);
    assert_eq!(deepgram.confirmed(), "a b");
    assert_eq!(deepgram.pending(), Some("c"));

    let assemblyai = unifier.transcript(Provider::AssemblyAi);
    assert_eq!(assemblyai.confirmed(), "x y z");
    assert_eq!(assemblyai.pending(), None);
}

#[test]
fn display_strips_markers_while_annotated_retains_them() {
    let mut unifier = TranscriptUnifier::new();
    unifier.apply(
        Provider::Deepgram,
        &UnifiedEvent::transcript("confirmed words", true),
    );
    unifier.apply(
        Provider::Deepgram,
        &UnifiedEvent::transcript("maybe more", false),
    );

    let transcript = unifier.transcript(Provider::Deepgram);
    assert_eq!(transcript.display(), "confirmed words");
    assert_eq!(
        transcript.annotated(),
        "confirmed words <interim>maybe more</interim>"
    );
}
