use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Movement request as sent by a viewer. Both fields stay raw so that an
/// unknown value reaches [`translate`] instead of failing decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveInstruction {
    #[serde(default)]
    pub move_type: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl MoveInstruction {
    pub fn new(move_type: impl Into<String>, direction: impl Into<String>) -> Self {
        Self {
            move_type: Some(move_type.into()),
            direction: Some(direction.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveType {
    Camera,
    Motor,
}

impl FromStr for MoveType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAMERA" => Ok(MoveType::Camera),
            "MOTOR" => Ok(MoveType::Motor),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Left,
    Right,
    Back,
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // viewers in the field still send the misspelled variant
            "FORWARD" | "FOWARD" => Ok(Direction::Forward),
            "LEFT" => Ok(Direction::Left),
            "RIGHT" => Ok(Direction::Right),
            "BACK" => Ok(Direction::Back),
            _ => Err(()),
        }
    }
}

/// A single ASCII byte understood by the motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(u8);

impl Command {
    pub const CAMERA_FORWARD: Command = Command(b'W');
    pub const CAMERA_LEFT: Command = Command(b'A');
    pub const CAMERA_RIGHT: Command = Command(b'D');
    pub const CAMERA_BACK: Command = Command(b'S');
    pub const MOTOR_FORWARD: Command = Command(b'F');
    pub const MOTOR_LEFT: Command = Command(b'L');
    pub const MOTOR_RIGHT: Command = Command(b'R');
    pub const MOTOR_BACK: Command = Command(b'B');
    pub const STOP: Command = Command(b'S');

    pub fn as_byte(&self) -> u8 {
        self.0
    }

    /// Command carried by a stop message, `S` when the message has none.
    pub fn stop(command: Option<&str>) -> Result<Self, InvalidCommand> {
        match command {
            None => Ok(Self::STOP),
            Some(raw) => raw.parse(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("`{0}` is not a single ASCII command")]
pub struct InvalidCommand(pub String);

impl FromStr for Command {
    type Err = InvalidCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.as_bytes() {
            [byte] if byte.is_ascii_graphic() => Ok(Command(*byte)),
            _ => Err(InvalidCommand(s.to_owned())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 as char)
    }
}

/// Maps a move instruction to its hardware command. `None` means the
/// instruction has no mapping and must not reach the hardware.
pub fn translate(instruction: &MoveInstruction) -> Option<Command> {
    let move_type: MoveType = instruction.move_type.as_deref()?.parse().ok()?;
    let direction: Direction = instruction.direction.as_deref()?.parse().ok()?;

    let command = match (move_type, direction) {
        (MoveType::Camera, Direction::Forward) => Command::CAMERA_FORWARD,
        (MoveType::Camera, Direction::Left) => Command::CAMERA_LEFT,
        (MoveType::Camera, Direction::Right) => Command::CAMERA_RIGHT,
        (MoveType::Camera, Direction::Back) => Command::CAMERA_BACK,
        (MoveType::Motor, Direction::Forward) => Command::MOTOR_FORWARD,
        (MoveType::Motor, Direction::Left) => Command::MOTOR_LEFT,
        (MoveType::Motor, Direction::Right) => Command::MOTOR_RIGHT,
        (MoveType::Motor, Direction::Back) => Command::MOTOR_BACK,
    };

    Some(command)
}
