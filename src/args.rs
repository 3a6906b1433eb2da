//! Kernel argument blocks and kernarg layout.
//!
//! A launch carries its arguments as parallel arrays of host pointers and
//! byte sizes (plus an optional interpretation tag per argument). The
//! accelerator backends lay the values out into a contiguous kernarg
//! buffer; each argument is aligned to its own size, capped at eight
//! bytes, which matches what the backend compilers assume for scalar and
//! pointer parameters.

use std::os::raw::c_void;

/// Interpretation tag for a kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ArgType {
    /// A scalar value, copied by size.
    Value = 0,
    /// A device pointer (the pointed-to value is the address).
    Pointer = 1,
    /// An aggregate passed by value.
    Structure = 2,
}

impl ArgType {
    pub fn from_i32(tag: i32) -> ArgType {
        match tag {
            1 => ArgType::Pointer,
            2 => ArgType::Structure,
            _ => ArgType::Value,
        }
    }
}

/// Borrowed view of one launch's argument block.
#[derive(Clone, Copy)]
pub struct KernelArgs<'a> {
    ptrs: &'a [*const c_void],
    sizes: &'a [usize],
    types: &'a [ArgType],
}

impl<'a> KernelArgs<'a> {
    /// `types` may be empty, in which case every argument is a `Value`.
    pub fn new(
        ptrs: &'a [*const c_void],
        sizes: &'a [usize],
        types: &'a [ArgType],
    ) -> KernelArgs<'a> {
        debug_assert_eq!(ptrs.len(), sizes.len());
        debug_assert!(types.is_empty() || types.len() == ptrs.len());
        KernelArgs { ptrs, sizes, types }
    }

    pub fn empty() -> KernelArgs<'static> {
        KernelArgs {
            ptrs: &[],
            sizes: &[],
            types: &[],
        }
    }

    pub fn len(&self) -> usize {
        self.ptrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ptrs.is_empty()
    }

    pub fn ptr(&self, idx: usize) -> *const c_void {
        self.ptrs[idx]
    }

    pub fn size(&self, idx: usize) -> usize {
        self.sizes[idx]
    }

    pub fn sizes(&self) -> &'a [usize] {
        self.sizes
    }

    pub fn arg_type(&self, idx: usize) -> ArgType {
        self.types.get(idx).copied().unwrap_or(ArgType::Value)
    }

    /// The caller-pointer array in the shape the CUDA driver expects for
    /// `kernel_params`: one pointer per argument, each pointing at the
    /// argument's value. The caller's pointers are used directly.
    pub fn param_array(&self) -> Vec<*mut c_void> {
        self.ptrs.iter().map(|&p| p as *mut c_void).collect()
    }
}

/// Alignment of an argument within the kernarg block: its size, capped at
/// eight bytes. Zero-sized arguments take no space and force no padding.
fn alignment(size: usize) -> usize {
    size.min(8).max(1)
}

fn round_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) / align * align
}

/// Computes the per-argument offsets and total size of the packed block.
pub fn layout(sizes: &[usize]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in sizes {
        offset = round_up(offset, alignment(size));
        offsets.push(offset);
        offset += size;
    }
    (offsets, offset)
}

/// Packs the argument values into `buf` and returns the total size the
/// layout wants, which may exceed `buf.len()` when the kernel's declared
/// kernarg segment disagrees with the caller's sizes. Writes never run
/// past the end of `buf`; arguments that do not fit are skipped and the
/// caller diagnoses the mismatch from the returned size.
///
/// # Safety
///
/// Every argument pointer must be readable for its declared size.
pub unsafe fn pack(args: &KernelArgs, buf: &mut [u8]) -> usize {
    let mut offset = 0;
    for idx in 0..args.len() {
        let size = args.size(idx);
        offset = round_up(offset, alignment(size));
        if offset + size <= buf.len() && size > 0 {
            std::ptr::copy_nonoverlapping(
                args.ptr(idx) as *const u8,
                buf.as_mut_ptr().add(offset),
                size,
            );
        }
        offset += size;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_aligned_and_monotonic() {
        let sizes = [1usize, 8, 2, 4, 16, 1, 8, 3];
        let (offsets, total) = layout(&sizes);

        assert_eq!(offsets.len(), sizes.len());
        for i in 0..sizes.len() {
            let align = sizes[i].min(8).max(1);
            assert_eq!(offsets[i] % align, 0, "arg {} misaligned", i);
            if i > 0 {
                assert!(offsets[i] >= offsets[i - 1] + sizes[i - 1]);
            }
        }
        assert!(total >= offsets[7] + sizes[7]);
    }

    #[test]
    fn pointer_sized_args_pack_tightly() {
        let (offsets, total) = layout(&[8, 8, 8]);
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(total, 24);
    }

    #[test]
    fn wide_args_align_to_eight() {
        // A 16-byte aggregate aligns to 8, not 16.
        let (offsets, total) = layout(&[4, 16]);
        assert_eq!(offsets, vec![0, 8]);
        assert_eq!(total, 24);
    }

    #[test]
    fn pack_copies_values_and_reports_full_size() {
        let a: u32 = 0xdeadbeef;
        let b: u64 = 0x0123456789abcdef;
        let c: u8 = 0x7f;
        let ptrs = [
            &a as *const u32 as *const c_void,
            &b as *const u64 as *const c_void,
            &c as *const u8 as *const c_void,
        ];
        let sizes = [4usize, 8, 1];
        let args = KernelArgs::new(&ptrs, &sizes, &[]);

        let (offsets, total) = layout(&sizes);
        let mut buf = vec![0u8; total];
        let written = unsafe { pack(&args, &mut buf) };

        assert_eq!(written, total);
        assert_eq!(&buf[offsets[0]..offsets[0] + 4], &a.to_ne_bytes());
        assert_eq!(&buf[offsets[1]..offsets[1] + 8], &b.to_ne_bytes());
        assert_eq!(buf[offsets[2]], c);
    }

    #[test]
    fn pack_never_overflows_a_short_buffer() {
        let a: u64 = 1;
        let b: u64 = 2;
        let ptrs = [
            &a as *const u64 as *const c_void,
            &b as *const u64 as *const c_void,
        ];
        let sizes = [8usize, 8];
        let args = KernelArgs::new(&ptrs, &sizes, &[]);

        // Declared segment is smaller than the layout wants; the second
        // argument is dropped but the full size is still reported.
        let mut buf = vec![0u8; 8];
        let written = unsafe { pack(&args, &mut buf) };
        assert_eq!(written, 16);
        assert_eq!(&buf[..8], &1u64.to_ne_bytes());
    }

    #[test]
    fn type_tags_default_to_value() {
        let args = KernelArgs::new(&[], &[], &[]);
        assert_eq!(args.arg_type(0), ArgType::Value);
        assert_eq!(ArgType::from_i32(1), ArgType::Pointer);
        assert_eq!(ArgType::from_i32(99), ArgType::Value);
    }
}
