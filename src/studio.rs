use tracing::{error, info};

use crate::gemini::HeadshotGenerator;
use crate::media::EncodedImage;
use crate::session::{Session, SessionEvent, SessionState};
use crate::styles::{find_style, HEADSHOT_STYLES};

const GENERATE_ERROR_MESSAGE: &str = "Failed to generate headshot. Please try again.";
const EDIT_ERROR_MESSAGE: &str = "Failed to edit headshot. Please try again.";

pub const HELP_TEXT: &str = "\
Commands:
  styles              list the style presets
  load <path>         load a source selfie (png/jpeg/webp/heic)
  style <id>          select a style preset
  generate            generate a headshot from the loaded selfie and style
  refine <text>       edit the generated headshot with a free-text instruction
  show                print the generated headshot as a data URI (viewable in a browser)
  save [path]         save the generated headshot (default: headshot-<style>.png)
  status              show the current session state
  reset               discard everything and start over
  quit                exit";

/// Drives one interactive session: owns the state machine and the generator
/// client, and turns command lines into session events and replies.
pub struct Studio<G> {
    session: Session,
    generator: G,
}

impl<G: HeadshotGenerator> Studio<G> {
    pub fn new(generator: G) -> Self {
        Studio {
            session: Session::new(),
            generator,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn handle_line(&mut self, line: &str) -> String {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => HELP_TEXT.to_string(),
            "styles" => list_styles(),
            "load" => self.load(rest).await,
            "style" => self.select_style(rest),
            "generate" => self.generate().await,
            "refine" => self.refine(rest).await,
            "show" => self.show(),
            "save" => self.save(rest).await,
            "status" => self.status(),
            "reset" => self.reset(),
            "" => String::new(),
            other => format!("Unknown command '{other}'. Type 'help' for the command list."),
        }
    }

    async fn load(&mut self, path: &str) -> String {
        if path.is_empty() {
            return "Usage: load <path>".to_string();
        }

        let image = match EncodedImage::from_file(path).await {
            Ok(image) => image,
            Err(err) => return format!("Could not load image: {err}"),
        };

        let mime_type = image.mime_type.clone();
        let size = image.len();
        match self.session.apply(SessionEvent::SourceSelected(image)) {
            Ok(()) => {
                info!("loaded source selfie from {path} ({mime_type}, {size} bytes)");
                format!("Loaded {path} ({mime_type}, {size} bytes). Now pick a style.")
            }
            Err(rejected) => format!("Cannot load an image right now: {rejected}"),
        }
    }

    fn select_style(&mut self, id: &str) -> String {
        if id.is_empty() {
            return "Usage: style <id>. Type 'styles' to list presets.".to_string();
        }

        let Some(style) = find_style(id) else {
            return format!("Unknown style '{id}'. Type 'styles' to list presets.");
        };

        match self.session.apply(SessionEvent::StyleSelected(style)) {
            Ok(()) => format!("Style set to {} ({})", style.name, style.description),
            Err(rejected) => format!("Cannot select a style: {rejected}"),
        }
    }

    async fn generate(&mut self) -> String {
        if let Err(rejected) = self.session.apply(SessionEvent::GenerateRequested) {
            return format!("Cannot generate: {rejected}");
        }

        let (source, style) = match self.session.state() {
            SessionState::Generating { source, style, .. } => (source.clone(), *style),
            _ => return "Cannot generate right now.".to_string(),
        };

        info!("generating headshot with style '{}'", style.id);
        match self.generator.generate(&source, style.prompt).await {
            Ok(image) => {
                let size = image.len();
                if let Err(rejected) = self.session.apply(SessionEvent::GenerateSucceeded(image)) {
                    return format!("Cannot record the result: {rejected}");
                }
                format!(
                    "Generated a {} headshot ({size} bytes). Use 'refine <text>' to adjust it or 'save' to keep it.",
                    style.name
                )
            }
            Err(err) => {
                error!("headshot generation failed: {err}");
                let _ = self
                    .session
                    .apply(SessionEvent::GenerateFailed(GENERATE_ERROR_MESSAGE.to_string()));
                GENERATE_ERROR_MESSAGE.to_string()
            }
        }
    }

    async fn refine(&mut self, instruction: &str) -> String {
        if let Err(rejected) = self
            .session
            .apply(SessionEvent::EditRequested(instruction.to_string()))
        {
            return format!("Cannot refine: {rejected}");
        }

        let (image, instruction) = match self.session.state() {
            SessionState::Editing {
                image, instruction, ..
            } => (image.clone(), instruction.clone()),
            _ => return "Cannot refine right now.".to_string(),
        };

        info!("refining headshot: {instruction}");
        match self.generator.edit(&image, &instruction).await {
            Ok(image) => {
                let size = image.len();
                if let Err(rejected) = self.session.apply(SessionEvent::EditSucceeded(image)) {
                    return format!("Cannot record the result: {rejected}");
                }
                format!("Applied the edit ({size} bytes). The previous result was replaced.")
            }
            Err(err) => {
                error!("headshot edit failed: {err}");
                let _ = self
                    .session
                    .apply(SessionEvent::EditFailed(EDIT_ERROR_MESSAGE.to_string()));
                EDIT_ERROR_MESSAGE.to_string()
            }
        }
    }

    fn show(&self) -> String {
        match self.session.result_image() {
            Some(image) => image.to_data_uri(),
            None => "Nothing to show yet. Generate a headshot first.".to_string(),
        }
    }

    async fn save(&mut self, path: &str) -> String {
        let Some(image) = self.session.result_image() else {
            return "Nothing to save yet. Generate a headshot first.".to_string();
        };

        let target = if path.is_empty() {
            match self.session.save_filename() {
                Some(name) => name,
                None => return "Nothing to save yet. Generate a headshot first.".to_string(),
            }
        } else {
            path.to_string()
        };

        match image.save_to(&target).await {
            Ok(()) => {
                info!("saved headshot to {target}");
                format!("Saved headshot to {target}")
            }
            Err(err) => format!("Could not save image: {err}"),
        }
    }

    fn status(&self) -> String {
        let mut lines = vec![format!("State: {}", self.session.state().label())];
        if let Some(source) = self.session.source() {
            lines.push(format!(
                "Source: {} ({} bytes)",
                source.mime_type,
                source.len()
            ));
        }
        if let Some(style) = self.session.selected_style() {
            lines.push(format!("Style: {} ({})", style.name, style.id));
        }
        if let Some(image) = self.session.result_image() {
            lines.push(format!(
                "Result: {} ({} bytes)",
                image.mime_type,
                image.len()
            ));
        }
        if let Some(message) = self.session.last_error() {
            lines.push(format!("Last error: {message}"));
        }
        lines.join("\n")
    }

    fn reset(&mut self) -> String {
        let _ = self.session.apply(SessionEvent::Reset);
        "Session cleared. Load a new selfie to start again.".to_string()
    }
}

fn list_styles() -> String {
    let mut lines = Vec::with_capacity(HEADSHOT_STYLES.len());
    for style in &HEADSHOT_STYLES {
        lines.push(format!(
            "  {:<16} {} — {}",
            style.id, style.name, style.description
        ));
    }
    lines.join("\n")
}
