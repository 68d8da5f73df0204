use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::cache::ImageCache;
use crate::gpu::TextureBackend;
use crate::view::ViewState;

/// Discrete user input driving the cache and the view.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Select(isize),
    Rotate(i32),
    FlipX,
    FlipY,
    ZoomIn,
    ZoomOut,
    Pan { dx: f32, dy: f32 },
    /// Free view rotation in degrees.
    ViewAngle(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
    Open(PathBuf),
    ResetView,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEventError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{command}` expects {expected}")]
    BadArgument {
        command: &'static str,
        expected: &'static str,
    },
}

impl FromStr for InputEvent {
    type Err = ParseEventError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        fn number<T: FromStr>(
            arg: Option<&str>,
            command: &'static str,
            expected: &'static str,
        ) -> Result<T, ParseEventError> {
            arg.and_then(|a| a.parse().ok())
                .ok_or(ParseEventError::BadArgument { command, expected })
        }

        let event = match command {
            "" => return Err(ParseEventError::Empty),
            "next" => Self::Select(1),
            "prev" => Self::Select(-1),
            "select" => Self::Select(number(args.next(), "select", "a signed offset")?),
            "rotate" => match args.next() {
                Some("cw") | None => Self::Rotate(1),
                Some("ccw") => Self::Rotate(-1),
                Some(_) => {
                    return Err(ParseEventError::BadArgument {
                        command: "rotate",
                        expected: "`cw` or `ccw`",
                    });
                }
            },
            "flip-x" => Self::FlipX,
            "flip-y" => Self::FlipY,
            "zoom" => match args.next() {
                Some("in") => Self::ZoomIn,
                Some("out") => Self::ZoomOut,
                _ => {
                    return Err(ParseEventError::BadArgument {
                        command: "zoom",
                        expected: "`in` or `out`",
                    });
                }
            },
            "pan" => Self::Pan {
                dx: number(args.next(), "pan", "two offsets")?,
                dy: number(args.next(), "pan", "two offsets")?,
            },
            "angle" => Self::ViewAngle(number(args.next(), "angle", "degrees")?),
            "contrast" => Self::Contrast(number(args.next(), "contrast", "a factor")?),
            "saturation" => Self::Saturation(number(args.next(), "saturation", "a factor")?),
            "hue" => Self::Hue(number(args.next(), "hue", "degrees")?),
            "open" if !rest.is_empty() => Self::Open(PathBuf::from(rest)),
            "open" => {
                return Err(ParseEventError::BadArgument {
                    command: "open",
                    expected: "a path",
                });
            }
            "reset" => Self::ResetView,
            other => return Err(ParseEventError::Unknown(other.to_string())),
        };
        Ok(event)
    }
}

/// Apply `event` to the cache and view.
pub fn dispatch<B: TextureBackend>(event: InputEvent, cache: &ImageCache<B>, view: &mut ViewState) {
    debug!(?event, "input");
    match event {
        InputEvent::Select(delta) => {
            cache.change_selected_index(delta);
        }
        InputEvent::Rotate(step) => {
            cache.rotate_current(step);
        }
        InputEvent::FlipX => {
            cache.flip_current_x();
        }
        InputEvent::FlipY => {
            cache.flip_current_y();
        }
        InputEvent::ZoomIn => view.zoom_in(),
        InputEvent::ZoomOut => view.zoom_out(),
        InputEvent::Pan { dx, dy } => view.pan(dx, dy),
        InputEvent::ViewAngle(degrees) => view.rotate_view(degrees.to_radians()),
        InputEvent::Contrast(v) => {
            cache.set_contrast(v);
        }
        InputEvent::Saturation(v) => {
            cache.set_saturation(v);
        }
        InputEvent::Hue(v) => {
            cache.set_hue(v);
        }
        InputEvent::Open(path) => {
            cache.set_path(path);
            view.reset();
        }
        InputEvent::ResetView => view.reset(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_navigation_and_edits() {
        assert_eq!("next".parse::<InputEvent>(), Ok(InputEvent::Select(1)));
        assert_eq!(" prev ".parse::<InputEvent>(), Ok(InputEvent::Select(-1)));
        assert_eq!("select -3".parse::<InputEvent>(), Ok(InputEvent::Select(-3)));
        assert_eq!("rotate ccw".parse::<InputEvent>(), Ok(InputEvent::Rotate(-1)));
        assert_eq!("rotate".parse::<InputEvent>(), Ok(InputEvent::Rotate(1)));
        assert_eq!("hue 45".parse::<InputEvent>(), Ok(InputEvent::Hue(45.0)));
        assert_eq!(
            "pan 0.1 -0.2".parse::<InputEvent>(),
            Ok(InputEvent::Pan { dx: 0.1, dy: -0.2 })
        );
        assert_eq!(
            "open /tmp/My Photos/a.png".parse::<InputEvent>(),
            Ok(InputEvent::Open(PathBuf::from("/tmp/My Photos/a.png")))
        );
    }

    #[test]
    fn rejects_malformed_commands() {
        assert_eq!("".parse::<InputEvent>(), Err(ParseEventError::Empty));
        assert!(matches!(
            "jump".parse::<InputEvent>(),
            Err(ParseEventError::Unknown(_))
        ));
        assert!(matches!(
            "contrast lots".parse::<InputEvent>(),
            Err(ParseEventError::BadArgument { command: "contrast", .. })
        ));
        assert!(matches!(
            "zoom sideways".parse::<InputEvent>(),
            Err(ParseEventError::BadArgument { .. })
        ));
        assert!("open".parse::<InputEvent>().is_err());
    }
}
