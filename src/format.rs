// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Generic image formats and their native translation.
//!
//! An [`ImageFormat`] describes the texels of an image semantically, as a
//! pair of channel order (how many channels, and which) and channel type
//! (bit width and numeric interpretation). The driver instead wants a
//! layout/type/swizzle triple ([`zero::ImageFormat`]). This module holds the
//! bidirectional mapping between the two representations.
//!
//! The mapping is driven by three static tables (numeric type, swizzle,
//! layout) so that both directions consult the same data: for every format
//! accepted by [`ImageFormat::to_native`], [`ImageFormat::from_native`]
//! returns the original format.
//!
//! Not every `ImageFormat` has a native form. Orders such as [`ChannelOrder::Rgb`]
//! and the packed 16/32-bit channel types exist because byte-size arithmetic
//! ([`ImageFormat::pixel_size`]) supports them; the translation path rejects
//! them with [`RuntimeError::InvalidValue`].

use crate::{zero, RuntimeError};
use half::f16;
use std::{error, fmt, mem};

/// The channels of a pixel, in memory order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelOrder {
    /// Alpha only.
    A,
    /// Red only.
    R,
    /// A single intensity channel, replicated on read.
    Intensity,
    /// A single luminance channel.
    Luminance,
    /// Red, green.
    Rg,
    /// Red, alpha.
    Ra,
    /// Red plus one undefined channel.
    Rx,
    /// Red, green, blue.
    Rgb,
    /// Red, green plus one undefined channel.
    Rgx,
    /// Red, green, blue, alpha.
    Rgba,
    /// Blue, green, red, alpha.
    Bgra,
    /// Alpha, red, green, blue.
    Argb,
    /// Alpha, blue, green, red.
    Abgr,
    /// Red, green, blue plus one undefined channel.
    Rgbx,
    /// sRGB-encoded red, green, blue, alpha.
    Srgba,
}

impl ChannelOrder {
    /// Returns the number of channels of the order.
    #[inline]
    pub fn num_channels(self) -> u32 {
        match self {
            ChannelOrder::A
            | ChannelOrder::R
            | ChannelOrder::Intensity
            | ChannelOrder::Luminance => 1,
            ChannelOrder::Rg | ChannelOrder::Ra | ChannelOrder::Rx => 2,
            ChannelOrder::Rgb | ChannelOrder::Rgx => 3,
            ChannelOrder::Rgba
            | ChannelOrder::Bgra
            | ChannelOrder::Argb
            | ChannelOrder::Abgr
            | ChannelOrder::Rgbx
            | ChannelOrder::Srgba => 4,
        }
    }
}

/// The in-memory representation of a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Signed normalized 8-bit integer.
    SnormInt8,
    /// Signed normalized 16-bit integer.
    SnormInt16,
    /// Unsigned normalized 8-bit integer.
    UnormInt8,
    /// Unsigned normalized 16-bit integer.
    UnormInt16,
    /// Packed normalized 5-6-5 RGB in one 16-bit word.
    UnormShort565,
    /// Packed normalized x-5-5-5 RGB in one 16-bit word.
    UnormShort555,
    /// Packed normalized x-10-10-10 RGB in one 32-bit word.
    UnormInt101010,
    /// Signed 8-bit integer.
    SignedInt8,
    /// Signed 16-bit integer.
    SignedInt16,
    /// Signed 32-bit integer.
    SignedInt32,
    /// Unsigned 8-bit integer.
    UnsignedInt8,
    /// Unsigned 16-bit integer.
    UnsignedInt16,
    /// Unsigned 32-bit integer.
    UnsignedInt32,
    /// 16-bit floating-point number.
    HalfFloat,
    /// 32-bit floating-point number.
    Float,
}

impl ChannelType {
    /// Returns the number of bytes a channel of this type occupies for the
    /// purposes of pitch arithmetic.
    #[inline]
    pub fn bytes_per_channel(self) -> u32 {
        match self {
            ChannelType::SnormInt8
            | ChannelType::UnormInt8
            | ChannelType::SignedInt8
            | ChannelType::UnsignedInt8 => 1,
            ChannelType::SnormInt16
            | ChannelType::UnormInt16
            | ChannelType::SignedInt16
            | ChannelType::UnsignedInt16
            | ChannelType::UnormShort565
            | ChannelType::UnormShort555 => 2,
            ChannelType::HalfFloat
            | ChannelType::UnormInt101010
            | ChannelType::SignedInt32
            | ChannelType::UnsignedInt32
            | ChannelType::Float => 4,
        }
    }
}

/// A generic image format, as supplied by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageFormat {
    pub channel_order: ChannelOrder,
    pub channel_type: ChannelType,
}

// Channel types that have a native numeric representation, with their native
// type and bit width. The packed types are deliberately absent.
const CHANNEL_TYPE_TABLE: &[(ChannelType, zero::ImageFormatType, u32)] = &[
    (ChannelType::SnormInt8, zero::ImageFormatType::SNORM, 8),
    (ChannelType::SnormInt16, zero::ImageFormatType::SNORM, 16),
    (ChannelType::UnormInt8, zero::ImageFormatType::UNORM, 8),
    (ChannelType::UnormInt16, zero::ImageFormatType::UNORM, 16),
    (ChannelType::SignedInt8, zero::ImageFormatType::SINT, 8),
    (ChannelType::SignedInt16, zero::ImageFormatType::SINT, 16),
    (ChannelType::SignedInt32, zero::ImageFormatType::SINT, 32),
    (ChannelType::UnsignedInt8, zero::ImageFormatType::UINT, 8),
    (ChannelType::UnsignedInt16, zero::ImageFormatType::UINT, 16),
    (ChannelType::UnsignedInt32, zero::ImageFormatType::UINT, 32),
    (ChannelType::HalfFloat, zero::ImageFormatType::FLOAT, 16),
    (ChannelType::Float, zero::ImageFormatType::FLOAT, 32),
];

// Channel orders that have a native layout, with their channel count and
// swizzle quadruple. Slots past the channel count are undefined and ignored
// when decoding.
const SWIZZLE_TABLE: &[(ChannelOrder, u32, [zero::ImageFormatSwizzle; 4])] = {
    use crate::zero::ImageFormatSwizzle as S;
    &[
        (ChannelOrder::R, 1, [S::R, S::X, S::X, S::X]),
        (ChannelOrder::A, 1, [S::A, S::X, S::X, S::X]),
        (ChannelOrder::Rg, 2, [S::R, S::G, S::X, S::X]),
        (ChannelOrder::Ra, 2, [S::R, S::A, S::X, S::X]),
        (ChannelOrder::Rx, 2, [S::R, S::X, S::X, S::X]),
        (ChannelOrder::Rgba, 4, [S::R, S::G, S::B, S::A]),
        (ChannelOrder::Rgbx, 4, [S::R, S::G, S::B, S::X]),
        (ChannelOrder::Argb, 4, [S::A, S::R, S::G, S::B]),
        (ChannelOrder::Bgra, 4, [S::B, S::G, S::R, S::A]),
    ]
};

// Native layouts by channel count and bit width.
const LAYOUT_TABLE: &[(u32, u32, zero::ImageFormatLayout)] = {
    use crate::zero::ImageFormatLayout as L;
    &[
        (1, 8, L::L8),
        (1, 16, L::L16),
        (1, 32, L::L32),
        (2, 8, L::L8_8),
        (2, 16, L::L16_16),
        (2, 32, L::L32_32),
        (4, 8, L::L8_8_8_8),
        (4, 16, L::L16_16_16_16),
        (4, 32, L::L32_32_32_32),
    ]
};

impl ChannelType {
    /// Returns the native numeric type and bit width of this channel type.
    ///
    /// The packed types have no per-channel native representation and return
    /// [`RuntimeError::InvalidValue`].
    pub(crate) fn to_native(self) -> Result<(zero::ImageFormatType, u32), RuntimeError> {
        CHANNEL_TYPE_TABLE
            .iter()
            .find(|&&(ty, _, _)| ty == self)
            .map(|&(_, native, width)| (native, width))
            .ok_or_else(|| {
                log::debug!("channel type {:?} has no native numeric type", self);
                RuntimeError::InvalidValue
            })
    }
}

impl ImageFormat {
    /// Translates the format into its native layout/type/swizzle triple.
    ///
    /// The bit width is derived from the channel type, the layout is derived
    /// independently from the channel order at that width, and the swizzle
    /// quadruple is fixed per channel order.
    pub fn to_native(&self) -> Result<zero::ImageFormat, RuntimeError> {
        let (native_type, width) = self.channel_type.to_native()?;

        let &(_, channels, swizzle) = SWIZZLE_TABLE
            .iter()
            .find(|&&(order, _, _)| order == self.channel_order)
            .ok_or_else(|| {
                log::debug!(
                    "channel order {:?} has no native layout",
                    self.channel_order,
                );
                RuntimeError::InvalidValue
            })?;

        // The numeric path only ever yields 8, 16 or 32 bits and the swizzle
        // table only ever yields 1, 2 or 4 channels, so the layout lookup
        // cannot miss.
        let layout = LAYOUT_TABLE
            .iter()
            .find(|&&(c, w, _)| c == channels && w == width)
            .map(|&(_, _, layout)| layout)
            .unwrap_or_else(|| unreachable!("no layout for {}x{}", channels, width));

        Ok(zero::ImageFormat {
            layout,
            ty: native_type,
            x: swizzle[0],
            y: swizzle[1],
            z: swizzle[2],
            w: swizzle[3],
        })
    }

    /// Recovers the generic format from a native layout/type/swizzle triple.
    ///
    /// This is the exact inverse of [`ImageFormat::to_native`] for every
    /// format that function accepts; any other combination returns
    /// [`RuntimeError::InvalidValue`].
    pub fn from_native(native: &zero::ImageFormat) -> Result<ImageFormat, RuntimeError> {
        let &(channels, width, _) = LAYOUT_TABLE
            .iter()
            .find(|&&(_, _, layout)| layout == native.layout)
            .ok_or_else(|| {
                log::debug!("unsupported native image format layout {:?}", native.layout);
                RuntimeError::InvalidValue
            })?;

        let swizzle = [native.x, native.y, native.z, native.w];
        let channel_order = SWIZZLE_TABLE
            .iter()
            .find(|&&(_, c, table)| {
                c == channels && table[..channels as usize] == swizzle[..channels as usize]
            })
            .map(|&(order, _, _)| order)
            .ok_or_else(|| {
                log::debug!("unexpected native image format swizzle {:?}", swizzle);
                RuntimeError::InvalidValue
            })?;

        let channel_type = CHANNEL_TYPE_TABLE
            .iter()
            .find(|&&(_, native_type, w)| native_type == native.ty && w == width)
            .map(|&(ty, _, _)| ty)
            .ok_or_else(|| {
                log::debug!(
                    "unexpected native image format type {:?} at {} bits",
                    native.ty,
                    width,
                );
                RuntimeError::InvalidValue
            })?;

        Ok(ImageFormat {
            channel_order,
            channel_type,
        })
    }

    /// Returns the size in bytes of one pixel of this format.
    ///
    /// This is pure byte arithmetic for the copy engine's pitch
    /// computations; it is defined for every format, including the ones the
    /// translation path rejects.
    #[inline]
    pub fn pixel_size(&self) -> u32 {
        self.channel_order.num_channels() * self.channel_type.bytes_per_channel()
    }
}

/// Trait for Rust types that can represent a pixel in an image.
pub unsafe trait Pixel {
    /// Returns an error if `Self` cannot be used as a source of pixels for
    /// `format`.
    fn ensure_accepts(format: &ImageFormat) -> Result<(), IncompatiblePixelsType>;

    /// The number of `Self`s which make up a single pixel.
    ///
    /// # Panics
    ///
    /// May panic if `ensure_accepts` would not return `Ok(())`.
    fn rate(format: &ImageFormat) -> u32;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IncompatiblePixelsType;

impl error::Error for IncompatiblePixelsType {}

impl fmt::Display for IncompatiblePixelsType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "supplied pixels' type is incompatible with this format")
    }
}

macro_rules! impl_pixel {
    {$($ty:ty;)+} => {
        $(impl_pixel!(inner $ty);)*
        $(impl_pixel!(inner [$ty; 1]);)*
        $(impl_pixel!(inner [$ty; 2]);)*
        $(impl_pixel!(inner [$ty; 3]);)*
        $(impl_pixel!(inner [$ty; 4]);)*
    };
    (inner $ty:ty) => {
        unsafe impl Pixel for $ty {
            fn ensure_accepts(format: &ImageFormat) -> Result<(), IncompatiblePixelsType> {
                if format.pixel_size() as usize % mem::size_of::<$ty>() == 0 {
                    Ok(())
                } else {
                    Err(IncompatiblePixelsType)
                }
            }

            fn rate(format: &ImageFormat) -> u32 {
                assert!(format.pixel_size() as usize % mem::size_of::<$ty>() == 0);
                format.pixel_size() / mem::size_of::<$ty>() as u32
            }
        }
    }
}

impl_pixel! {
    u8; i8; u16; i16; u32; i32; u64; i64; f16; f32; f64;
}

#[cfg(test)]
mod tests {
    use super::{ChannelOrder, ChannelType, ImageFormat, Pixel};
    use crate::{zero, RuntimeError};

    const ALL_ORDERS: [ChannelOrder; 15] = [
        ChannelOrder::A,
        ChannelOrder::R,
        ChannelOrder::Intensity,
        ChannelOrder::Luminance,
        ChannelOrder::Rg,
        ChannelOrder::Ra,
        ChannelOrder::Rx,
        ChannelOrder::Rgb,
        ChannelOrder::Rgx,
        ChannelOrder::Rgba,
        ChannelOrder::Bgra,
        ChannelOrder::Argb,
        ChannelOrder::Abgr,
        ChannelOrder::Rgbx,
        ChannelOrder::Srgba,
    ];

    const ALL_TYPES: [ChannelType; 15] = [
        ChannelType::SnormInt8,
        ChannelType::SnormInt16,
        ChannelType::UnormInt8,
        ChannelType::UnormInt16,
        ChannelType::UnormShort565,
        ChannelType::UnormShort555,
        ChannelType::UnormInt101010,
        ChannelType::SignedInt8,
        ChannelType::SignedInt16,
        ChannelType::SignedInt32,
        ChannelType::UnsignedInt8,
        ChannelType::UnsignedInt16,
        ChannelType::UnsignedInt32,
        ChannelType::HalfFloat,
        ChannelType::Float,
    ];

    #[test]
    fn round_trip() {
        let mut accepted = 0;

        for &channel_order in &ALL_ORDERS {
            for &channel_type in &ALL_TYPES {
                let format = ImageFormat {
                    channel_order,
                    channel_type,
                };

                if let Ok(native) = format.to_native() {
                    accepted += 1;
                    assert_eq!(ImageFormat::from_native(&native), Ok(format));
                }
            }
        }

        // 9 translatable orders x 12 translatable types.
        assert_eq!(accepted, 9 * 12);
    }

    #[test]
    fn pixel_size() {
        let format = ImageFormat {
            channel_order: ChannelOrder::Rgba,
            channel_type: ChannelType::UnsignedInt8,
        };
        assert_eq!(format.pixel_size(), 4);

        let format = ImageFormat {
            channel_order: ChannelOrder::R,
            channel_type: ChannelType::Float,
        };
        assert_eq!(format.pixel_size(), 4);

        let format = ImageFormat {
            channel_order: ChannelOrder::Rg,
            channel_type: ChannelType::UnormInt16,
        };
        assert_eq!(format.pixel_size(), 4);
    }

    #[test]
    fn three_channel_order_not_translatable() {
        let format = ImageFormat {
            channel_order: ChannelOrder::Rgb,
            channel_type: ChannelType::UnsignedInt8,
        };
        assert_eq!(format.to_native(), Err(RuntimeError::InvalidValue));
    }

    #[test]
    fn packed_type_not_translatable() {
        let format = ImageFormat {
            channel_order: ChannelOrder::Rgba,
            channel_type: ChannelType::UnormShort565,
        };
        assert_eq!(format.to_native(), Err(RuntimeError::InvalidValue));
    }

    #[test]
    fn swizzle_follows_channel_order() {
        let native = ImageFormat {
            channel_order: ChannelOrder::Bgra,
            channel_type: ChannelType::UnormInt8,
        }
        .to_native()
        .unwrap();

        assert_eq!(native.layout, zero::ImageFormatLayout::L8_8_8_8);
        assert_eq!(native.x, zero::ImageFormatSwizzle::B);
        assert_eq!(native.y, zero::ImageFormatSwizzle::G);
        assert_eq!(native.z, zero::ImageFormatSwizzle::R);
        assert_eq!(native.w, zero::ImageFormatSwizzle::A);
    }

    #[test]
    fn reverse_rejects_unorm_32() {
        let native = zero::ImageFormat {
            layout: zero::ImageFormatLayout::L32,
            ty: zero::ImageFormatType::UNORM,
            x: zero::ImageFormatSwizzle::R,
            y: zero::ImageFormatSwizzle::X,
            z: zero::ImageFormatSwizzle::X,
            w: zero::ImageFormatSwizzle::X,
        };
        assert_eq!(
            ImageFormat::from_native(&native),
            Err(RuntimeError::InvalidValue)
        );
    }

    #[test]
    fn reverse_rejects_unknown_swizzle() {
        let native = zero::ImageFormat {
            layout: zero::ImageFormatLayout::L8,
            ty: zero::ImageFormatType::UINT,
            x: zero::ImageFormatSwizzle::G,
            y: zero::ImageFormatSwizzle::X,
            z: zero::ImageFormatSwizzle::X,
            w: zero::ImageFormatSwizzle::X,
        };
        assert_eq!(
            ImageFormat::from_native(&native),
            Err(RuntimeError::InvalidValue)
        );
    }

    #[test]
    fn pixel_rate() {
        let format = ImageFormat {
            channel_order: ChannelOrder::Rgba,
            channel_type: ChannelType::Float,
        };
        assert!(<[f32; 4]>::ensure_accepts(&format).is_ok());
        assert_eq!(<f32 as Pixel>::rate(&format), 4);
        assert_eq!(<u8 as Pixel>::rate(&format), 16);
    }
}
