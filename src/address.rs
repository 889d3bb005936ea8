/*!

N-dimensional tile addressing for a [`crate::arch::TopLevel`]. An `Address`
identifies one tile; dimensionality is fixed for the lifetime of a
`TopLevel` and every `Address` produced from it shares that dimensionality.

*/

use std::cmp::{min,max};
use std::fmt;
use quantifiable_derive::Quantifiable;
use crate::quantify::Quantifiable;

/// An N-dimensional integer tuple locating a tile.
#[derive(Clone,Debug,PartialEq,Eq,Hash,PartialOrd,Ord,Quantifiable)]
pub struct Address
{
	coordinates: Vec<i64>,
}

impl Address
{
	pub fn new(coordinates: Vec<i64>) -> Address
	{
		Address{ coordinates }
	}
	pub fn dimension(&self) -> usize
	{
		self.coordinates.len()
	}
	pub fn coordinates(&self) -> &[i64]
	{
		&self.coordinates
	}
	pub fn get(&self, axis: usize) -> i64
	{
		self.coordinates[axis]
	}
	/// Componentwise minimum.
	pub fn componentwise_min(&self, other: &Address) -> Address
	{
		assert_eq!(self.dimension(),other.dimension(),"addresses of different dimensionality");
		Address::new(self.coordinates.iter().zip(other.coordinates.iter()).map(|(a,b)|min(*a,*b)).collect())
	}
	/// Componentwise maximum.
	pub fn componentwise_max(&self, other: &Address) -> Address
	{
		assert_eq!(self.dimension(),other.dimension(),"addresses of different dimensionality");
		Address::new(self.coordinates.iter().zip(other.coordinates.iter()).map(|(a,b)|max(*a,*b)).collect())
	}
	/// L-infinity (Chebyshev) distance between two addresses, used to bound move-generator radii.
	pub fn chebyshev_distance(&self, other: &Address) -> i64
	{
		assert_eq!(self.dimension(),other.dimension(),"addresses of different dimensionality");
		self.coordinates.iter().zip(other.coordinates.iter()).map(|(a,b)|(a-b).abs()).max().unwrap_or(0)
	}
	/// Manhattan (L1) distance, used by [`crate::distance::DistanceLut`] when the tile-adjacency
	/// graph is a grid and hop distance coincides with L1 distance; the LUT itself is built from
	/// the adjacency graph via BFS and does not assume this, but tests use it as a sanity check.
	pub fn manhattan_distance(&self, other: &Address) -> i64
	{
		assert_eq!(self.dimension(),other.dimension(),"addresses of different dimensionality");
		self.coordinates.iter().zip(other.coordinates.iter()).map(|(a,b)|(a-b).abs()).sum()
	}
	pub fn add(&self, delta: &[i64]) -> Address
	{
		assert_eq!(self.dimension(),delta.len(),"delta of different dimensionality");
		Address::new(self.coordinates.iter().zip(delta.iter()).map(|(a,b)|a+b).collect())
	}
}

impl fmt::Display for Address
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
	{
		write!(f,"(")?;
		for (i,c) in self.coordinates.iter().enumerate()
		{
			if i>0 { write!(f,",")?; }
			write!(f,"{c}")?;
		}
		write!(f,")")
	}
}

/// Bijection between `Address` tuples over fixed `sides` and a dense `0..size` index, used to
/// key into flat arrays such as the grid or the distance LUT. Grounded on the packing scheme of
/// a Cartesian tile grid: mixed-radix positional encoding over `sides`.
#[derive(Clone,Debug)]
pub struct AddressSpace
{
	sides: Vec<i64>,
	size: usize,
}

impl AddressSpace
{
	pub fn new(sides: Vec<i64>) -> AddressSpace
	{
		assert!(sides.iter().all(|&s|s>0),"every side must be positive");
		let size = sides.iter().product::<i64>() as usize;
		AddressSpace{ sides, size }
	}
	pub fn dimension(&self) -> usize
	{
		self.sides.len()
	}
	pub fn sides(&self) -> &[i64]
	{
		&self.sides
	}
	pub fn size(&self) -> usize
	{
		self.size
	}
	pub fn contains(&self, address: &Address) -> bool
	{
		address.dimension()==self.dimension()
			&& address.coordinates().iter().zip(self.sides.iter()).all(|(c,s)|*c>=0 && c<s)
	}
	/// Pack an address into a dense index in `0..size()`.
	pub fn pack(&self, address: &Address) -> usize
	{
		assert!(self.contains(address),"address {address} outside address space with sides {:?}",self.sides);
		let mut index: i64 = 0;
		let mut stride: i64 = 1;
		for (c,s) in address.coordinates().iter().zip(self.sides.iter())
		{
			index += c*stride;
			stride *= s;
		}
		index as usize
	}
	/// Unpack a dense index back into an address.
	pub fn unpack(&self, mut index: usize) -> Address
	{
		assert!(index<self.size,"index {index} outside address space of size {}",self.size);
		let mut coordinates = Vec::with_capacity(self.sides.len());
		for &side in &self.sides
		{
			let side = side as usize;
			coordinates.push((index%side) as i64);
			index /= side;
		}
		Address::new(coordinates)
	}
	/// Iterate over every address in the space, in packed-index order.
	pub fn iter(&self) -> impl Iterator<Item=Address> + '_
	{
		(0..self.size).map(move|i|self.unpack(i))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;

	#[test]
	fn pack_unpack_roundtrip()
	{
		let space = AddressSpace::new(vec![4,3,2]);
		for i in 0..space.size()
		{
			let address = space.unpack(i);
			assert_eq!(space.pack(&address),i);
		}
	}

	#[test]
	fn componentwise_min_max()
	{
		let a = Address::new(vec![1,5,2]);
		let b = Address::new(vec![3,2,2]);
		assert_eq!(a.componentwise_min(&b),Address::new(vec![1,2,2]));
		assert_eq!(a.componentwise_max(&b),Address::new(vec![3,5,2]));
	}

	#[test]
	fn distances()
	{
		let a = Address::new(vec![0,0]);
		let b = Address::new(vec![3,4]);
		assert_eq!(a.manhattan_distance(&b),7);
		assert_eq!(a.chebyshev_distance(&b),4);
	}
}
