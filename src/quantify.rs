/*!

Memory accounting used to populate the `*_bytes` metrics attached to a `Map`
after placement and routing (see [`crate::map`]).

Mirrors the `Quantifiable` trait of the crate this one is descended from:
every state type the SA driver or Pathfinder owns reports its own heap
footprint so a caller can track memory without instrumenting the allocator.

*/

use std::mem::size_of;

/// Something that can report how much memory it occupies, beyond `size_of::<Self>()`.
pub trait Quantifiable
{
	/// Total memory in bytes, including heap-allocated contents.
	fn total_memory(&self) -> usize;
	/// Print a breakdown of the memory use to stdout. Most implementors leave this unimplemented.
	fn print_memory_breakdown(&self)
	{
		unimplemented!();
	}
	/// Estimate future memory use. Most implementors leave this unimplemented.
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

impl<T: Quantifiable> Quantifiable for Vec<T>
{
	fn total_memory(&self) -> usize
	{
		size_of::<Vec<T>>() + self.iter().map(|x| x.total_memory()).sum::<usize>()
	}
}

impl<T: Quantifiable> Quantifiable for Option<T>
{
	fn total_memory(&self) -> usize
	{
		size_of::<Option<T>>() + self.as_ref().map(|x| x.total_memory()).unwrap_or(0)
	}
}

macro_rules! quantifiable_as_size_of
{
	($($t:ty),*) =>
	{
		$(
			impl Quantifiable for $t
			{
				fn total_memory(&self) -> usize
				{
					size_of::<$t>()
				}
			}
		)*
	}
}

quantifiable_as_size_of!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, bool);
