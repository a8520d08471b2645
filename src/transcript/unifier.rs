use crate::events::UnifiedEvent;
use crate::providers::Provider;

/// Markers wrapping the provisional tail in the annotated rendering.
pub const INTERIM_OPEN: &str = "<interim>";
pub const INTERIM_CLOSE: &str = "</interim>";

/// Running transcript for one provider.
///
/// The confirmed prefix is append-only. The pending region is replaced
/// wholesale by each interim result and dropped when a final result lands —
/// it is never appended to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccumulatedTranscript {
    confirmed: String,
    pending: Option<String>,
}

impl AccumulatedTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one recognition result into the buffer.
    pub fn apply(&mut self, text: &str, is_final: bool) {
        if is_final {
            self.pending = None;
            if !self.confirmed.is_empty() {
                self.confirmed.push(' ');
            }
            self.confirmed.push_str(text);
        } else {
            self.pending = Some(text.to_string());
        }
    }

    pub fn confirmed(&self) -> &str {
        &self.confirmed
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Marker-free rendering for display.
    pub fn display(&self) -> &str {
        &self.confirmed
    }

    /// Rendering with the pending region wrapped in interim markers, so a
    /// consumer can style the provisional tail distinctly.
    pub fn annotated(&self) -> String {
        match &self.pending {
            Some(pending) if self.confirmed.is_empty() => {
                format!("{}{}{}", INTERIM_OPEN, pending, INTERIM_CLOSE)
            }
            Some(pending) => format!(
                "{} {}{}{}",
                self.confirmed, INTERIM_OPEN, pending, INTERIM_CLOSE
            ),
            None => self.confirmed.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty() && self.pending.is_none()
    }
}

/// Per-provider transcript accumulation.
///
/// Each provider's buffer is updated only by that provider's events; no
/// cross-provider merging happens here (that is the curation call's job).
#[derive(Debug, Default)]
pub struct TranscriptUnifier {
    deepgram: AccumulatedTranscript,
    assemblyai: AccumulatedTranscript,
}

impl TranscriptUnifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one unified event into the named provider's buffer. Status and
    /// error events leave the transcript untouched.
    pub fn apply(&mut self, provider: Provider, event: &UnifiedEvent) {
        if let UnifiedEvent::Transcript { text, is_final } = event {
            self.buffer_mut(provider).apply(text, *is_final);
        }
    }

    pub fn transcript(&self, provider: Provider) -> &AccumulatedTranscript {
        match provider {
            Provider::Deepgram => &self.deepgram,
            Provider::AssemblyAi => &self.assemblyai,
        }
    }

    fn buffer_mut(&mut self, provider: Provider) -> &mut AccumulatedTranscript {
        match provider {
            Provider::Deepgram => &mut self.deepgram,
            Provider::AssemblyAi => &mut self.assemblyai,
        }
    }
}
