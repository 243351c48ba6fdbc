// Copyright (c) 2024 The zerano developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Raw Level Zero API surface.
//!
//! This module mirrors the subset of `ze_api.h` that the rest of the crate
//! needs: handles, result codes, descriptor structures and the entry-point
//! table. Everything here is plain data and raw function pointers; the safe
//! wrappers live in the other modules.
//!
//! Entry points are resolved by name through a [`Loader`](crate::library::Loader)
//! and collected into a [`ZeroFunctions`] table, so that both the real
//! `ze_loader` library and custom loaders can provide them.

use std::ffi::CStr;
use std::mem;
use std::os::raw::{c_char, c_void};

/// Common interface for the raw handle types.
pub trait Handle: Copy {
    /// Returns the raw numerical value of the handle.
    fn as_raw(self) -> u64;
    /// Builds a handle from a raw numerical value.
    fn from_raw(raw: u64) -> Self;
    /// The null handle.
    fn null() -> Self;
    /// Returns whether the handle is null.
    #[inline]
    fn is_null(self) -> bool
    where
        Self: Sized + PartialEq,
    {
        self.as_raw() == 0
    }
}

macro_rules! handles {
    ($($(#[doc = $doc:literal])* $name:ident,)+) => {
        $(
            $(#[doc = $doc])*
            #[repr(transparent)]
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(u64);

            impl Handle for $name {
                #[inline]
                fn as_raw(self) -> u64 {
                    self.0
                }
                #[inline]
                fn from_raw(raw: u64) -> Self {
                    Self(raw)
                }
                #[inline]
                fn null() -> Self {
                    Self(0)
                }
            }
        )+
    };
}

handles! {
    /// `ze_driver_handle_t`
    DriverHandle,
    /// `ze_device_handle_t`
    DeviceHandle,
    /// `ze_context_handle_t`
    ContextHandle,
    /// `ze_command_queue_handle_t`
    CommandQueueHandle,
    /// `ze_command_list_handle_t`
    CommandListHandle,
    /// `ze_fence_handle_t`
    FenceHandle,
    /// `ze_event_pool_handle_t`
    EventPoolHandle,
    /// `ze_event_handle_t`
    EventHandle,
    /// `ze_image_handle_t`
    ImageHandle,
    /// `ze_sampler_handle_t`
    SamplerHandle,
}

/// `ze_result_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Result(pub i32);

impl Result {
    pub const SUCCESS: Self = Self(0);
    pub const NOT_READY: Self = Self(1);
    pub const ERROR_DEVICE_LOST: Self = Self(0x7000_0001);
    pub const ERROR_OUT_OF_HOST_MEMORY: Self = Self(0x7000_0002);
    pub const ERROR_OUT_OF_DEVICE_MEMORY: Self = Self(0x7000_0003);
    pub const ERROR_UNINITIALIZED: Self = Self(0x7800_0001);
    pub const ERROR_UNSUPPORTED_VERSION: Self = Self(0x7800_0002);
    pub const ERROR_UNSUPPORTED_FEATURE: Self = Self(0x7800_0003);
    pub const ERROR_INVALID_ARGUMENT: Self = Self(0x7800_0004);
    pub const ERROR_INVALID_NULL_HANDLE: Self = Self(0x7800_0005);
    pub const ERROR_INVALID_NULL_POINTER: Self = Self(0x7800_0007);
    pub const ERROR_INVALID_SIZE: Self = Self(0x7800_0008);
    pub const ERROR_INVALID_ENUMERATION: Self = Self(0x7800_000d);
    pub const ERROR_UNSUPPORTED_IMAGE_FORMAT: Self = Self(0x7800_000f);
    pub const ERROR_UNKNOWN: Self = Self(0x7fff_fffe);

    #[inline]
    pub fn as_raw(self) -> i32 {
        self.0
    }
}

/// `ze_structure_type_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StructureType(pub i32);

impl StructureType {
    pub const CONTEXT_DESC: Self = Self(0xd);
    pub const COMMAND_QUEUE_DESC: Self = Self(0xe);
    pub const COMMAND_LIST_DESC: Self = Self(0xf);
    pub const EVENT_POOL_DESC: Self = Self(0x10);
    pub const EVENT_DESC: Self = Self(0x11);
    pub const IMAGE_DESC: Self = Self(0x13);
    pub const DEVICE_MEM_ALLOC_DESC: Self = Self(0x15);
    pub const MEMORY_ALLOCATION_PROPERTIES: Self = Self(0x17);
    pub const BINDLESS_IMAGE_EXP_DESC: Self = Self(0x0002_0023);
    pub const PITCHED_IMAGE_EXP_DESC: Self = Self(0x0002_0024);
}

/// `ze_image_format_layout_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageFormatLayout(pub i32);

impl ImageFormatLayout {
    pub const L8: Self = Self(0);
    pub const L16: Self = Self(1);
    pub const L32: Self = Self(2);
    pub const L8_8: Self = Self(3);
    pub const L8_8_8_8: Self = Self(4);
    pub const L16_16: Self = Self(5);
    pub const L16_16_16_16: Self = Self(6);
    pub const L32_32: Self = Self(7);
    pub const L32_32_32_32: Self = Self(8);
}

/// `ze_image_format_type_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageFormatType(pub i32);

impl ImageFormatType {
    pub const UINT: Self = Self(0);
    pub const SINT: Self = Self(1);
    pub const UNORM: Self = Self(2);
    pub const SNORM: Self = Self(3);
    pub const FLOAT: Self = Self(4);
}

/// `ze_image_format_swizzle_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageFormatSwizzle(pub i32);

impl ImageFormatSwizzle {
    pub const R: Self = Self(0);
    pub const G: Self = Self(1);
    pub const B: Self = Self(2);
    pub const A: Self = Self(3);
    pub const ZERO: Self = Self(4);
    pub const ONE: Self = Self(5);
    pub const X: Self = Self(6);
}

/// `ze_image_type_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageType(pub i32);

impl ImageType {
    pub const TYPE_1D: Self = Self(0);
    pub const TYPE_1DARRAY: Self = Self(1);
    pub const TYPE_2D: Self = Self(2);
    pub const TYPE_2DARRAY: Self = Self(3);
    pub const TYPE_3D: Self = Self(4);
    pub const TYPE_BUFFER: Self = Self(5);
}

/// `ze_memory_type_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MemoryType(pub i32);

impl MemoryType {
    pub const UNKNOWN: Self = Self(0);
    pub const HOST: Self = Self(1);
    pub const DEVICE: Self = Self(2);
    pub const SHARED: Self = Self(3);
}

/// `ze_image_flags_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageFlags(pub u32);

impl ImageFlags {
    pub const KERNEL_WRITE: Self = Self(1);
    pub const BIAS_UNCACHED: Self = Self(2);

    #[inline]
    pub fn empty() -> Self {
        Self(0)
    }
}

/// `ze_image_bindless_exp_flags_t`
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BindlessImageExpFlags(pub u32);

impl BindlessImageExpFlags {
    pub const BINDLESS: Self = Self(1);
    pub const SAMPLED_IMAGE: Self = Self(2);
}

/// `ze_image_format_t`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageFormat {
    pub layout: ImageFormatLayout,
    pub ty: ImageFormatType,
    pub x: ImageFormatSwizzle,
    pub y: ImageFormatSwizzle,
    pub z: ImageFormatSwizzle,
    pub w: ImageFormatSwizzle,
}

/// `ze_image_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub flags: ImageFlags,
    pub ty: ImageType,
    pub format: ImageFormat,
    pub width: u64,
    pub height: u32,
    pub depth: u32,
    pub array_levels: u32,
    pub mip_levels: u32,
}

/// `ze_image_bindless_exp_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct BindlessImageExpDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub flags: BindlessImageExpFlags,
}

/// `ze_image_pitched_exp_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct PitchedImageExpDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub ptr: *mut c_void,
}

/// `ze_image_region_t`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageRegion {
    pub origin_x: u32,
    pub origin_y: u32,
    pub origin_z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// `ze_copy_region_t`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyRegion {
    pub origin_x: u32,
    pub origin_y: u32,
    pub origin_z: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// `ze_memory_allocation_properties_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct MemoryAllocationProperties {
    pub stype: StructureType,
    pub pnext: *mut c_void,
    pub ty: MemoryType,
    pub id: u64,
    pub page_size: u64,
}

/// `ze_context_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ContextDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub flags: u32,
}

/// `ze_device_mem_alloc_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DeviceMemAllocDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub flags: u32,
    pub ordinal: u32,
}

/// `ze_command_queue_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct CommandQueueDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub ordinal: u32,
    pub index: u32,
    pub flags: u32,
    pub mode: i32,
    pub priority: i32,
}

/// `ze_command_list_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct CommandListDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub command_queue_group_ordinal: u32,
    pub flags: u32,
}

/// `ze_event_pool_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct EventPoolDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub flags: u32,
    pub count: u32,
}

/// `ze_event_pool_flags_t`
pub const EVENT_POOL_FLAG_HOST_VISIBLE: u32 = 1;

/// `ze_event_desc_t`
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct EventDesc {
    pub stype: StructureType,
    pub pnext: *const c_void,
    pub index: u32,
    pub signal: u32,
    pub wait: u32,
}

pub type PFN_zeInit = unsafe extern "system" fn(flags: u32) -> Result;
pub type PFN_zeDriverGet =
    unsafe extern "system" fn(count: *mut u32, drivers: *mut DriverHandle) -> Result;
pub type PFN_zeDriverGetExtensionFunctionAddress = unsafe extern "system" fn(
    driver: DriverHandle,
    name: *const c_char,
    ppfn: *mut *const c_void,
) -> Result;
pub type PFN_zeDeviceGet = unsafe extern "system" fn(
    driver: DriverHandle,
    count: *mut u32,
    devices: *mut DeviceHandle,
) -> Result;
pub type PFN_zeContextCreate = unsafe extern "system" fn(
    driver: DriverHandle,
    desc: *const ContextDesc,
    context: *mut ContextHandle,
) -> Result;
pub type PFN_zeContextDestroy = unsafe extern "system" fn(context: ContextHandle) -> Result;
pub type PFN_zeContextMakeImageResident = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    image: ImageHandle,
) -> Result;
pub type PFN_zeImageCreate = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    desc: *const ImageDesc,
    image: *mut ImageHandle,
) -> Result;
pub type PFN_zeImageDestroy = unsafe extern "system" fn(image: ImageHandle) -> Result;
pub type PFN_zeImageViewCreateExt = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    desc: *const ImageDesc,
    image: ImageHandle,
    view: *mut ImageHandle,
) -> Result;
pub type PFN_zeMemAllocDevice = unsafe extern "system" fn(
    context: ContextHandle,
    desc: *const DeviceMemAllocDesc,
    size: usize,
    alignment: usize,
    device: DeviceHandle,
    ptr: *mut *mut c_void,
) -> Result;
pub type PFN_zeMemFree =
    unsafe extern "system" fn(context: ContextHandle, ptr: *mut c_void) -> Result;
pub type PFN_zeMemGetAllocProperties = unsafe extern "system" fn(
    context: ContextHandle,
    ptr: *const c_void,
    props: *mut MemoryAllocationProperties,
    device: *mut DeviceHandle,
) -> Result;
pub type PFN_zeCommandQueueCreate = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    desc: *const CommandQueueDesc,
    queue: *mut CommandQueueHandle,
) -> Result;
pub type PFN_zeCommandQueueDestroy =
    unsafe extern "system" fn(queue: CommandQueueHandle) -> Result;
pub type PFN_zeCommandQueueExecuteCommandLists = unsafe extern "system" fn(
    queue: CommandQueueHandle,
    count: u32,
    lists: *const CommandListHandle,
    fence: FenceHandle,
) -> Result;
pub type PFN_zeCommandQueueSynchronize =
    unsafe extern "system" fn(queue: CommandQueueHandle, timeout: u64) -> Result;
pub type PFN_zeCommandListCreate = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    desc: *const CommandListDesc,
    list: *mut CommandListHandle,
) -> Result;
pub type PFN_zeCommandListClose = unsafe extern "system" fn(list: CommandListHandle) -> Result;
pub type PFN_zeCommandListReset = unsafe extern "system" fn(list: CommandListHandle) -> Result;
pub type PFN_zeCommandListDestroy = unsafe extern "system" fn(list: CommandListHandle) -> Result;
pub type PFN_zeCommandListAppendImageCopyFromMemory = unsafe extern "system" fn(
    list: CommandListHandle,
    dst: ImageHandle,
    src: *const c_void,
    region: *const ImageRegion,
    signal: EventHandle,
    num_wait: u32,
    wait: *const EventHandle,
) -> Result;
pub type PFN_zeCommandListAppendImageCopyToMemory = unsafe extern "system" fn(
    list: CommandListHandle,
    dst: *mut c_void,
    src: ImageHandle,
    region: *const ImageRegion,
    signal: EventHandle,
    num_wait: u32,
    wait: *const EventHandle,
) -> Result;
pub type PFN_zeCommandListAppendMemoryCopyRegion = unsafe extern "system" fn(
    list: CommandListHandle,
    dst: *mut c_void,
    dst_region: *const CopyRegion,
    dst_pitch: u32,
    dst_slice_pitch: u32,
    src: *const c_void,
    src_region: *const CopyRegion,
    src_pitch: u32,
    src_slice_pitch: u32,
    signal: EventHandle,
    num_wait: u32,
    wait: *const EventHandle,
) -> Result;
pub type PFN_zeEventPoolCreate = unsafe extern "system" fn(
    context: ContextHandle,
    desc: *const EventPoolDesc,
    num_devices: u32,
    devices: *const DeviceHandle,
    pool: *mut EventPoolHandle,
) -> Result;
pub type PFN_zeEventPoolDestroy = unsafe extern "system" fn(pool: EventPoolHandle) -> Result;
pub type PFN_zeEventCreate = unsafe extern "system" fn(
    pool: EventPoolHandle,
    desc: *const EventDesc,
    event: *mut EventHandle,
) -> Result;
pub type PFN_zeEventDestroy = unsafe extern "system" fn(event: EventHandle) -> Result;

// Optional extension entry points, resolved per driver through
// `zeDriverGetExtensionFunctionAddress` rather than through the loader.
pub type PFN_zeImageGetDeviceOffsetExp =
    unsafe extern "system" fn(image: ImageHandle, offset: *mut u64) -> Result;
pub type PFN_zeMemGetPitchFor2dImage = unsafe extern "system" fn(
    context: ContextHandle,
    device: DeviceHandle,
    image_width: usize,
    image_height: usize,
    element_size: u32,
    row_pitch: *mut usize,
) -> Result;

macro_rules! fns {
    ($struct_name:ident, { $($member:ident => $ty:ty, $name:literal,)+ }) => {
        pub struct $struct_name {
            $(
                pub $member: $ty,
            )+
        }

        impl $struct_name {
            /// Resolves every entry point through `load_fn`, failing on the
            /// first missing symbol.
            pub fn load<F>(mut load_fn: F) -> ::std::result::Result<$struct_name, &'static str>
                where F: FnMut(&CStr) -> *const c_void
            {
                Ok($struct_name {
                    $(
                        $member: {
                            let name = unsafe {
                                CStr::from_bytes_with_nul_unchecked($name)
                            };
                            let ptr = load_fn(name);
                            if ptr.is_null() {
                                return Err(::std::str::from_utf8(
                                    &$name[..$name.len() - 1],
                                ).unwrap());
                            }
                            unsafe { mem::transmute::<*const c_void, $ty>(ptr) }
                        },
                    )+
                })
            }
        }
    };
}

fns!(ZeroFunctions, {
    init => PFN_zeInit, b"zeInit\0",
    driver_get => PFN_zeDriverGet, b"zeDriverGet\0",
    driver_get_extension_function_address => PFN_zeDriverGetExtensionFunctionAddress,
        b"zeDriverGetExtensionFunctionAddress\0",
    device_get => PFN_zeDeviceGet, b"zeDeviceGet\0",
    context_create => PFN_zeContextCreate, b"zeContextCreate\0",
    context_destroy => PFN_zeContextDestroy, b"zeContextDestroy\0",
    context_make_image_resident => PFN_zeContextMakeImageResident,
        b"zeContextMakeImageResident\0",
    image_create => PFN_zeImageCreate, b"zeImageCreate\0",
    image_destroy => PFN_zeImageDestroy, b"zeImageDestroy\0",
    image_view_create_ext => PFN_zeImageViewCreateExt, b"zeImageViewCreateExt\0",
    mem_alloc_device => PFN_zeMemAllocDevice, b"zeMemAllocDevice\0",
    mem_free => PFN_zeMemFree, b"zeMemFree\0",
    mem_get_alloc_properties => PFN_zeMemGetAllocProperties, b"zeMemGetAllocProperties\0",
    command_queue_create => PFN_zeCommandQueueCreate, b"zeCommandQueueCreate\0",
    command_queue_destroy => PFN_zeCommandQueueDestroy, b"zeCommandQueueDestroy\0",
    command_queue_execute_command_lists => PFN_zeCommandQueueExecuteCommandLists,
        b"zeCommandQueueExecuteCommandLists\0",
    command_queue_synchronize => PFN_zeCommandQueueSynchronize, b"zeCommandQueueSynchronize\0",
    command_list_create => PFN_zeCommandListCreate, b"zeCommandListCreate\0",
    command_list_close => PFN_zeCommandListClose, b"zeCommandListClose\0",
    command_list_reset => PFN_zeCommandListReset, b"zeCommandListReset\0",
    command_list_destroy => PFN_zeCommandListDestroy, b"zeCommandListDestroy\0",
    command_list_append_image_copy_from_memory => PFN_zeCommandListAppendImageCopyFromMemory,
        b"zeCommandListAppendImageCopyFromMemory\0",
    command_list_append_image_copy_to_memory => PFN_zeCommandListAppendImageCopyToMemory,
        b"zeCommandListAppendImageCopyToMemory\0",
    command_list_append_memory_copy_region => PFN_zeCommandListAppendMemoryCopyRegion,
        b"zeCommandListAppendMemoryCopyRegion\0",
    event_pool_create => PFN_zeEventPoolCreate, b"zeEventPoolCreate\0",
    event_pool_destroy => PFN_zeEventPoolDestroy, b"zeEventPoolDestroy\0",
    event_create => PFN_zeEventCreate, b"zeEventCreate\0",
    event_destroy => PFN_zeEventDestroy, b"zeEventDestroy\0",
});
