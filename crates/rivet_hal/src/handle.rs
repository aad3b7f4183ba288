//! Bit-packed resource handles.
//!
//! A [`Handle`] is a 32-bit signed integer, not a pointer. Its layout is:
//!
//! | Bits  | Field                                  |
//! |-------|----------------------------------------|
//! | 0–15  | slot index                             |
//! | 16–23 | rolling version                        |
//! | 24–30 | resource type tag ([`HandleType`])     |
//! | 31    | error flag                             |
//!
//! Call sites never do the arithmetic themselves: they build handles with
//! [`Handle::new`] and take them apart with [`Handle::decode`] or
//! [`Handle::typed_index`].

use core::fmt;

const INDEX_MASK: u32 = 0xFFFF;
const VERSION_SHIFT: u32 = 16;
const VERSION_MASK: u32 = 0xFF;
const TYPE_SHIFT: u32 = 24;
const TYPE_MASK: u32 = 0x7F;
const ERROR_BIT: u32 = 1 << 31;

/// The invalid handle.
///
/// Its type tag is the reserved "undefined" value `0`, so it never decodes
/// successfully and never matches a registry.
pub const INVALID_HANDLE: Handle = Handle(0);

// ─────────────────────────────────────────────────────────────────────────────
// HandleType
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of resource kinds a handle can refer to.
///
/// The discriminant is the 7-bit tag stored in bits 24–30. Tag `0` is reserved
/// for [`INVALID_HANDLE`] and has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum HandleType {
    /// Digital input/output channel.
    Dio = 1,
    /// Physical port.
    Port = 2,
    /// Periodic notifier.
    Notifier = 3,
    /// Interrupt source.
    Interrupt = 4,
    /// Analog output channel.
    AnalogOutput = 5,
    /// Analog input channel.
    AnalogInput = 6,
    /// Analog trigger.
    AnalogTrigger = 7,
    /// Relay channel.
    Relay = 8,
    /// PWM output.
    Pwm = 9,
    /// PWM generated on a digital channel.
    DigitalPwm = 10,
    /// Pulse counter.
    Counter = 11,
    /// FPGA quadrature encoder.
    FpgaEncoder = 12,
    /// Encoder (FPGA or counter backed).
    Encoder = 13,
    /// Pneumatic compressor.
    Compressor = 14,
    /// Pneumatic solenoid.
    Solenoid = 15,
    /// Analog gyroscope.
    AnalogGyro = 16,
    /// Vendor-defined resource.
    Vendor = 17,
    /// Simulation callback resource.
    SimulationJni = 18,
    /// CAN device.
    Can = 19,
    /// Serial port.
    SerialPort = 20,
    /// Duty cycle input.
    DutyCycle = 21,
    /// DMA engine.
    Dma = 22,
    /// Addressable LED strip.
    AddressableLed = 23,
    /// CTRE pneumatics control module.
    CtrePcm = 24,
    /// CTRE power distribution panel.
    CtrePdp = 25,
    /// REV power distribution hub.
    RevPdh = 26,
    /// REV pneumatic hub.
    RevPh = 27,
}

impl HandleType {
    /// Every handle type, in tag order.
    pub const ALL: [HandleType; 27] = [
        HandleType::Dio,
        HandleType::Port,
        HandleType::Notifier,
        HandleType::Interrupt,
        HandleType::AnalogOutput,
        HandleType::AnalogInput,
        HandleType::AnalogTrigger,
        HandleType::Relay,
        HandleType::Pwm,
        HandleType::DigitalPwm,
        HandleType::Counter,
        HandleType::FpgaEncoder,
        HandleType::Encoder,
        HandleType::Compressor,
        HandleType::Solenoid,
        HandleType::AnalogGyro,
        HandleType::Vendor,
        HandleType::SimulationJni,
        HandleType::Can,
        HandleType::SerialPort,
        HandleType::DutyCycle,
        HandleType::Dma,
        HandleType::AddressableLed,
        HandleType::CtrePcm,
        HandleType::CtrePdp,
        HandleType::RevPdh,
        HandleType::RevPh,
    ];

    /// Returns the 7-bit tag for this type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Looks up a type by its tag.
    ///
    /// Returns `None` for the reserved tag `0` and for unassigned tags.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => None,
            tag => Self::ALL.get(usize::from(tag) - 1).copied(),
        }
    }
}

impl fmt::Display for HandleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DecodedHandle / DecodeError
// ─────────────────────────────────────────────────────────────────────────────

/// The fields of a successfully decoded handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedHandle {
    /// Slot index within the minting registry.
    pub index: u16,
    /// Resource kind.
    pub kind: HandleType,
    /// Slot version at mint time.
    pub version: u8,
}

/// Reasons a handle fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The handle is [`INVALID_HANDLE`] or carries the reserved type tag.
    #[error("invalid handle")]
    Invalid,

    /// Bit 31 is set.
    #[error("handle has the error flag set")]
    ErrorFlag,

    /// The type tag is not a known [`HandleType`].
    #[error("unknown handle type tag {0}")]
    UnknownType(u8),
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque reference to a resource held by a handle registry.
///
/// The version field is 8 bits, so staleness detection is bounded: once a
/// slot has been freed or reset 256 times, a handle minted for its first
/// occupant carries the current version again and resolves to whatever now
/// occupies the slot.
///
/// # Example
///
/// ```
/// use rivet_hal::handle::{Handle, HandleType};
///
/// let handle = Handle::new(3, HandleType::Encoder, 7);
/// assert_eq!(handle.typed_index(HandleType::Encoder, 7), Some(3));
///
/// // Wrong type or wrong version fails closed.
/// assert_eq!(handle.typed_index(HandleType::Counter, 7), None);
/// assert_eq!(handle.typed_index(HandleType::Encoder, 8), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(i32);

impl Handle {
    /// Packs an index, type tag and version into a handle.
    #[must_use]
    pub const fn new(index: u16, kind: HandleType, version: u8) -> Self {
        let bits = ((kind.tag() as u32 & TYPE_MASK) << TYPE_SHIFT)
            | ((version as u32) << VERSION_SHIFT)
            | index as u32;
        Self(bits as i32)
    }

    /// Wraps a raw integer received from outside the crate.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer representation.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    const fn bits(self) -> u32 {
        self.0 as u32
    }

    /// Splits the handle into its fields.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::ErrorFlag`] if bit 31 is set
    /// - [`DecodeError::Invalid`] if the type tag is the reserved `0`
    /// - [`DecodeError::UnknownType`] if the type tag is unassigned
    pub fn decode(self) -> Result<DecodedHandle, DecodeError> {
        let bits = self.bits();
        if bits & ERROR_BIT != 0 {
            return Err(DecodeError::ErrorFlag);
        }

        let tag = ((bits >> TYPE_SHIFT) & TYPE_MASK) as u8;
        if tag == 0 {
            return Err(DecodeError::Invalid);
        }
        let kind = HandleType::from_tag(tag).ok_or(DecodeError::UnknownType(tag))?;

        Ok(DecodedHandle {
            index: (bits & INDEX_MASK) as u16,
            kind,
            version: ((bits >> VERSION_SHIFT) & VERSION_MASK) as u8,
        })
    }

    /// Returns `true` if the handle decodes successfully.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.decode().is_ok()
    }

    /// Returns the decoded type, if any.
    #[must_use]
    pub fn kind(self) -> Option<HandleType> {
        self.decode().ok().map(|decoded| decoded.kind)
    }

    /// Extracts the slot index if the handle has the expected type and version.
    ///
    /// Returns `None` for any mismatch so a handle can never index into a
    /// table it was not minted from.
    #[must_use]
    pub fn typed_index(self, kind: HandleType, version: u8) -> Option<u16> {
        let decoded = self.decode().ok()?;
        (decoded.kind == kind && decoded.version == version).then_some(decoded.index)
    }

    /// Extracts the slot index checking only the type tag.
    ///
    /// Used by registries running without version checks, where handle reuse
    /// across resets cannot occur.
    #[must_use]
    pub fn typed_index_unversioned(self, kind: HandleType) -> Option<u16> {
        let decoded = self.decode().ok()?;
        (decoded.kind == kind).then_some(decoded.index)
    }
}

impl Default for Handle {
    fn default() -> Self {
        INVALID_HANDLE
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Ok(decoded) => write!(
                f,
                "{}[{}]v{}",
                decoded.kind, decoded.index, decoded.version
            ),
            Err(_) => write!(f, "invalid({:#010x})", self.bits()),
        }
    }
}
