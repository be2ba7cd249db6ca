use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs, io};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use viewbridge::{
    default_keybinds, AvatarHandle, AvatarInputController, BlendedMovementHandler, Controller,
    FrameEvents, KeybindProfile, KeybindProfileError, Keybinds, KeyboardNativeComputer,
    NativePressState, PrimaryViewport, RenderTargetProvider, ViewportId,
};

use super::loop_runner::{LoopConfig, StudioWiring};
use super::sim::{EngineSim, StudioAvatar, StudioTargetProvider};

const KEYBINDS_ENV_VAR: &str = "VIEWBRIDGE_KEYBINDS";
const PRIMARY_VIEWPORT_ID: ViewportId = ViewportId(1);

#[derive(Debug, Error)]
enum KeybindLoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error(transparent)]
    Resolve(#[from] KeybindProfileError),
}

pub(crate) fn build_app() -> StudioWiring {
    init_tracing();
    info!("=== Viewbridge Studio Startup ===");

    let press_state = Arc::new(NativePressState::new());
    let avatar = Arc::new(StudioAvatar::default());
    let handler = Arc::new(BlendedMovementHandler::new(
        Arc::clone(&avatar) as Arc<dyn AvatarHandle>,
        Box::new(KeyboardNativeComputer::new(Arc::clone(&press_state))),
    ));

    let provider = Arc::new(StudioTargetProvider::default());
    let viewport = Arc::new(PrimaryViewport::new(
        PRIMARY_VIEWPORT_ID,
        Some(Arc::clone(&provider) as Arc<dyn RenderTargetProvider>),
    ));

    let frame_events = Arc::new(FrameEvents::new());
    let controller =
        AvatarInputController::spawn(Arc::clone(&viewport), Arc::clone(&handler), &frame_events);
    controller.base().put_keybinds(load_keybinds());

    let sim = EngineSim::new(avatar, handler);

    StudioWiring {
        config: LoopConfig::default(),
        frame_events,
        viewport,
        controller,
        press_state,
        provider,
        sim,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_keybinds() -> Keybinds {
    match env::var(KEYBINDS_ENV_VAR) {
        Ok(path) => match read_profile(Path::new(&path)) {
            Ok(binds) => {
                info!(path = %path, count = binds.len(), "keybind_profile_loaded");
                binds
            }
            Err(error) => {
                warn!(
                    path = %path,
                    error = %error,
                    "keybind profile rejected; falling back to default layout"
                );
                default_keybinds()
            }
        },
        Err(env::VarError::NotPresent) => default_keybinds(),
        Err(error) => {
            warn!(
                env_var = KEYBINDS_ENV_VAR,
                error = %error,
                "unable to read keybinds env var; falling back to default layout"
            );
            default_keybinds()
        }
    }
}

fn read_profile(path: &Path) -> Result<Keybinds, KeybindLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| KeybindLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let profile: KeybindProfile = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|source| KeybindLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(profile.resolve()?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use viewbridge::Action;
    use winit::keyboard::KeyCode;

    use super::*;

    fn profile_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write profile");
        file
    }

    #[test]
    fn valid_profile_file_resolves_to_keybinds() {
        let file = profile_file(r#"{"KeyI": "move_forward", "KeyK": "move_back"}"#);

        let binds = read_profile(file.path()).expect("profile loads");
        assert_eq!(binds.get(&KeyCode::KeyI), Some(&Action::MoveForward));
        assert_eq!(binds.get(&KeyCode::KeyK), Some(&Action::MoveBack));
    }

    #[test]
    fn malformed_json_reports_a_parse_error() {
        let file = profile_file(r#"{"KeyI": "#);

        let error = read_profile(file.path()).expect_err("parse must fail");
        assert!(matches!(error, KeybindLoadError::Parse { .. }));
    }

    #[test]
    fn unknown_key_name_reports_a_resolve_error() {
        let file = profile_file(r#"{"NoSuchKey": "jump"}"#);

        let error = read_profile(file.path()).expect_err("resolve must fail");
        assert!(matches!(error, KeybindLoadError::Resolve(_)));
    }

    #[test]
    fn missing_file_reports_a_read_error() {
        let error =
            read_profile(Path::new("definitely/not/a/profile.json")).expect_err("read must fail");
        assert!(matches!(error, KeybindLoadError::Read { .. }));
    }
}
