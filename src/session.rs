use crate::media::EncodedImage;
use crate::styles::{download_filename, HeadshotStyle};

/// Session lifecycle as a tagged union. Transient states carry everything
/// needed to roll back, so a failed call restores the pre-call state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Ready {
        source: EncodedImage,
        style: Option<&'static HeadshotStyle>,
    },
    Generating {
        source: EncodedImage,
        style: &'static HeadshotStyle,
        prior: Option<EncodedImage>,
    },
    Result {
        source: EncodedImage,
        style: &'static HeadshotStyle,
        image: EncodedImage,
    },
    Editing {
        source: EncodedImage,
        style: &'static HeadshotStyle,
        image: EncodedImage,
        instruction: String,
    },
}

impl SessionState {
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Ready { .. } => "ready",
            SessionState::Generating { .. } => "generating",
            SessionState::Result { .. } => "result",
            SessionState::Editing { .. } => "editing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SourceSelected(EncodedImage),
    StyleSelected(&'static HeadshotStyle),
    GenerateRequested,
    GenerateSucceeded(EncodedImage),
    GenerateFailed(String),
    EditRequested(String),
    EditSucceeded(EncodedImage),
    EditFailed(String),
    Reset,
}

impl SessionEvent {
    fn label(&self) -> &'static str {
        match self {
            SessionEvent::SourceSelected(_) => "source-selected",
            SessionEvent::StyleSelected(_) => "style-selected",
            SessionEvent::GenerateRequested => "generate",
            SessionEvent::GenerateSucceeded(_) => "generate-succeeded",
            SessionEvent::GenerateFailed(_) => "generate-failed",
            SessionEvent::EditRequested(_) => "edit",
            SessionEvent::EditSucceeded(_) => "edit-succeeded",
            SessionEvent::EditFailed(_) => "edit-failed",
            SessionEvent::Reset => "reset",
        }
    }
}

/// A rejected event. The session is left untouched; callers treat this as a
/// no-op and may surface the message.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Rejected {
    #[error("no source image loaded")]
    NoSource,
    #[error("no style selected")]
    NoStyle,
    #[error("no generated headshot to work with")]
    NoResult,
    #[error("edit instruction is empty")]
    EmptyInstruction,
    #[error("a request is already in flight")]
    Busy,
    #[error("event '{event}' is not valid in state '{state}'")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Idle
    }
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn source(&self) -> Option<&EncodedImage> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Ready { source, .. }
            | SessionState::Generating { source, .. }
            | SessionState::Result { source, .. }
            | SessionState::Editing { source, .. } => Some(source),
        }
    }

    pub fn selected_style(&self) -> Option<&'static HeadshotStyle> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Ready { style, .. } => *style,
            SessionState::Generating { style, .. }
            | SessionState::Result { style, .. }
            | SessionState::Editing { style, .. } => Some(style),
        }
    }

    pub fn result_image(&self) -> Option<&EncodedImage> {
        match &self.state {
            SessionState::Result { image, .. } | SessionState::Editing { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn can_generate(&self) -> bool {
        matches!(
            &self.state,
            SessionState::Ready { style: Some(_), .. } | SessionState::Result { .. }
        )
    }

    pub fn can_edit(&self) -> bool {
        matches!(&self.state, SessionState::Result { .. })
    }

    /// Filename for a local save, derived from the selected preset.
    pub fn save_filename(&self) -> Option<String> {
        match &self.state {
            SessionState::Result { style, .. } => Some(download_filename(style)),
            _ => None,
        }
    }

    /// Single mutation path for the session. Every rejected event leaves the
    /// session exactly as it was.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), Rejected> {
        let state = std::mem::take(&mut self.state);
        match self.transition(state, event) {
            Ok(next) => {
                self.state = next;
                Ok(())
            }
            Err((prior, rejection)) => {
                self.state = prior;
                Err(rejection)
            }
        }
    }

    fn transition(
        &mut self,
        state: SessionState,
        event: SessionEvent,
    ) -> Result<SessionState, (SessionState, Rejected)> {
        use SessionEvent as Ev;
        use SessionState as St;

        match (state, event) {
            (_, Ev::Reset) => {
                self.last_error = None;
                Ok(St::Idle)
            }

            (St::Idle, Ev::SourceSelected(source)) => Ok(St::Ready {
                source,
                style: None,
            }),
            (St::Ready { style, .. }, Ev::SourceSelected(source)) => {
                Ok(St::Ready { source, style })
            }
            (St::Result { style, image, .. }, Ev::SourceSelected(source)) => Ok(St::Result {
                source,
                style,
                image,
            }),

            (St::Ready { source, .. }, Ev::StyleSelected(style)) => Ok(St::Ready {
                source,
                style: Some(style),
            }),
            (St::Result { source, image, .. }, Ev::StyleSelected(style)) => Ok(St::Result {
                source,
                style,
                image,
            }),
            (state @ St::Idle, Ev::StyleSelected(_)) => Err((state, Rejected::NoSource)),

            (
                St::Ready {
                    source,
                    style: Some(style),
                },
                Ev::GenerateRequested,
            ) => {
                self.last_error = None;
                Ok(St::Generating {
                    source,
                    style,
                    prior: None,
                })
            }
            (
                St::Result {
                    source,
                    style,
                    image,
                },
                Ev::GenerateRequested,
            ) => {
                self.last_error = None;
                Ok(St::Generating {
                    source,
                    style,
                    prior: Some(image),
                })
            }
            (state @ St::Ready { style: None, .. }, Ev::GenerateRequested) => {
                Err((state, Rejected::NoStyle))
            }
            (state @ St::Idle, Ev::GenerateRequested) => Err((state, Rejected::NoSource)),

            (St::Generating { source, style, .. }, Ev::GenerateSucceeded(image)) => {
                Ok(St::Result {
                    source,
                    style,
                    image,
                })
            }
            (
                St::Generating {
                    source,
                    style,
                    prior,
                },
                Ev::GenerateFailed(message),
            ) => {
                self.last_error = Some(message);
                match prior {
                    Some(image) => Ok(St::Result {
                        source,
                        style,
                        image,
                    }),
                    None => Ok(St::Ready {
                        source,
                        style: Some(style),
                    }),
                }
            }

            (state @ St::Result { .. }, Ev::EditRequested(instruction))
                if instruction.trim().is_empty() =>
            {
                Err((state, Rejected::EmptyInstruction))
            }
            (
                St::Result {
                    source,
                    style,
                    image,
                },
                Ev::EditRequested(instruction),
            ) => {
                self.last_error = None;
                Ok(St::Editing {
                    source,
                    style,
                    image,
                    instruction,
                })
            }
            (state @ (St::Idle | St::Ready { .. }), Ev::EditRequested(_)) => {
                Err((state, Rejected::NoResult))
            }

            (St::Editing { source, style, .. }, Ev::EditSucceeded(image)) => Ok(St::Result {
                source,
                style,
                image,
            }),
            (
                St::Editing {
                    source,
                    style,
                    image,
                    ..
                },
                Ev::EditFailed(message),
            ) => {
                self.last_error = Some(message);
                Ok(St::Result {
                    source,
                    style,
                    image,
                })
            }

            (state @ (St::Generating { .. } | St::Editing { .. }), event)
                if matches!(
                    &event,
                    Ev::SourceSelected(_)
                        | Ev::StyleSelected(_)
                        | Ev::GenerateRequested
                        | Ev::EditRequested(_)
                ) =>
            {
                Err((state, Rejected::Busy))
            }

            (state, event) => {
                let rejection = Rejected::InvalidTransition {
                    event: event.label(),
                    state: state.label(),
                };
                Err((state, rejection))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::styles::find_style;

    fn png(byte: u8) -> EncodedImage {
        EncodedImage {
            bytes: vec![byte; 8],
            mime_type: "image/png".to_string(),
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::new();
        session
            .apply(SessionEvent::SourceSelected(png(1)))
            .unwrap();
        session
            .apply(SessionEvent::StyleSelected(
                find_style("corporate-grey").unwrap(),
            ))
            .unwrap();
        session
    }

    fn result_session() -> Session {
        let mut session = ready_session();
        session.apply(SessionEvent::GenerateRequested).unwrap();
        session
            .apply(SessionEvent::GenerateSucceeded(png(2)))
            .unwrap();
        session
    }

    #[test]
    fn starts_idle_with_nothing_loaded() {
        let session = Session::new();
        assert_eq!(session.state().label(), "idle");
        assert!(session.source().is_none());
        assert!(!session.can_generate());
        assert!(!session.can_edit());
    }

    #[test]
    fn generate_is_a_no_op_without_source_or_style() {
        let mut session = Session::new();
        assert_eq!(
            session.apply(SessionEvent::GenerateRequested),
            Err(Rejected::NoSource)
        );

        session
            .apply(SessionEvent::SourceSelected(png(1)))
            .unwrap();
        assert_eq!(
            session.apply(SessionEvent::GenerateRequested),
            Err(Rejected::NoStyle)
        );
        assert_eq!(session.state().label(), "ready");
    }

    #[test]
    fn style_selection_requires_a_source() {
        let mut session = Session::new();
        let style = find_style("modern-tech").unwrap();
        assert_eq!(
            session.apply(SessionEvent::StyleSelected(style)),
            Err(Rejected::NoSource)
        );
    }

    #[test]
    fn successful_generation_moves_ready_to_result() {
        let mut session = ready_session();
        assert!(session.can_generate());

        session.apply(SessionEvent::GenerateRequested).unwrap();
        assert_eq!(session.state().label(), "generating");

        session
            .apply(SessionEvent::GenerateSucceeded(png(7)))
            .unwrap();
        assert_eq!(session.state().label(), "result");
        assert_eq!(session.result_image(), Some(&png(7)));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn failed_generation_returns_to_ready_and_records_error() {
        let mut session = ready_session();
        session.apply(SessionEvent::GenerateRequested).unwrap();
        session
            .apply(SessionEvent::GenerateFailed("boom".to_string()))
            .unwrap();

        assert_eq!(session.state().label(), "ready");
        assert_eq!(session.last_error(), Some("boom"));
        // Style selection survives the failure.
        assert!(session.can_generate());
    }

    #[test]
    fn failed_regeneration_keeps_the_prior_result_visible() {
        let mut session = result_session();
        session.apply(SessionEvent::GenerateRequested).unwrap();
        session
            .apply(SessionEvent::GenerateFailed("boom".to_string()))
            .unwrap();

        assert_eq!(session.state().label(), "result");
        assert_eq!(session.result_image(), Some(&png(2)));
        assert_eq!(session.last_error(), Some("boom"));
    }

    #[test]
    fn duplicate_generate_while_in_flight_is_rejected() {
        let mut session = ready_session();
        session.apply(SessionEvent::GenerateRequested).unwrap();
        assert_eq!(
            session.apply(SessionEvent::GenerateRequested),
            Err(Rejected::Busy)
        );

        let style = find_style("outdoor-natural").unwrap();
        assert_eq!(
            session.apply(SessionEvent::StyleSelected(style)),
            Err(Rejected::Busy)
        );
    }

    #[test]
    fn empty_edit_instruction_is_rejected_in_place() {
        let mut session = result_session();
        assert_eq!(
            session.apply(SessionEvent::EditRequested("   ".to_string())),
            Err(Rejected::EmptyInstruction)
        );
        assert_eq!(session.state().label(), "result");
    }

    #[test]
    fn edit_requires_an_existing_result() {
        let mut session = ready_session();
        assert_eq!(
            session.apply(SessionEvent::EditRequested("add a tie".to_string())),
            Err(Rejected::NoResult)
        );
    }

    #[test]
    fn successful_edit_overwrites_the_result() {
        let mut session = result_session();
        session
            .apply(SessionEvent::EditRequested("add a blue tie".to_string()))
            .unwrap();
        assert_eq!(session.state().label(), "editing");

        session.apply(SessionEvent::EditSucceeded(png(9))).unwrap();
        assert_eq!(session.result_image(), Some(&png(9)));
    }

    #[test]
    fn failed_edit_keeps_the_previous_image() {
        let mut session = result_session();
        session
            .apply(SessionEvent::EditRequested("warmer lighting".to_string()))
            .unwrap();
        session
            .apply(SessionEvent::EditFailed("boom".to_string()))
            .unwrap();

        assert_eq!(session.state().label(), "result");
        assert_eq!(session.result_image(), Some(&png(2)));
        assert_eq!(session.last_error(), Some("boom"));
    }

    #[test]
    fn reset_returns_to_idle_from_any_state() {
        let mut session = result_session();
        session
            .apply(SessionEvent::EditRequested("brighter".to_string()))
            .unwrap();
        session.apply(SessionEvent::Reset).unwrap();

        assert_eq!(session.state().label(), "idle");
        assert!(session.source().is_none());
        assert!(session.selected_style().is_none());
        assert!(session.result_image().is_none());
        assert!(session.last_error().is_none());
    }

    #[test]
    fn save_filename_tracks_the_selected_preset() {
        let session = result_session();
        assert_eq!(
            session.save_filename().as_deref(),
            Some("headshot-corporate-grey.png")
        );
        assert!(ready_session().save_filename().is_none());
    }

    #[test]
    fn changing_style_on_a_result_retargets_the_next_generation() {
        let mut session = result_session();
        let style = find_style("executive-dark").unwrap();
        session.apply(SessionEvent::StyleSelected(style)).unwrap();
        assert_eq!(session.selected_style(), Some(style));
        assert_eq!(
            session.save_filename().as_deref(),
            Some("headshot-executive-dark.png")
        );
    }
}
