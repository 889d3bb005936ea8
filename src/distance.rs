/*!

Component A: the distance LUT. Precomputes all-pairs hop distance between
tile addresses of a [`crate::arch::TopLevel`] so the cost model's hot loop
(§4.E) never allocates or traverses a graph: every query is an O(1) array
read into a flat [`Matrix`].

*/

use std::collections::VecDeque;
use std::mem::size_of;
use crate::address::{Address,AddressSpace};
use crate::arch::TopLevel;
use crate::matrix::Matrix;
use crate::quantify::Quantifiable;

/// Sentinel stored in the distance matrix for unreachable address pairs.
pub const UNREACHABLE: u32 = u32::MAX;

/// All-pairs hop distance between tile addresses, computed once by BFS from every source tile
/// over the tile-adjacency graph induced by the architecture's outward links.
#[derive(Clone,Debug)]
pub struct DistanceLut
{
	space: AddressSpace,
	distances: Matrix<u32>,
}

impl DistanceLut
{
	/// Build the LUT from a `TopLevel`'s own link structure: `neighbours[a]` is every address
	/// reachable from `a` via a link declared somewhere inside tile `a` whose other endpoint's
	/// path is rooted at a different address.
	pub fn build(top: &TopLevel) -> DistanceLut
	{
		let space = top.address_space().clone();
		let neighbours = Self::neighbours_from_top_level(top);
		DistanceLut::from_neighbours(space,&neighbours)
	}
	/// Build directly from a precomputed neighbour table, one entry per packed address index.
	/// Exposed so callers whose adjacency is not expressed purely through architecture links
	/// (e.g. synthetic test fixtures) can still build a conforming LUT.
	pub fn from_neighbours(space: AddressSpace, neighbours: &[Vec<usize>]) -> DistanceLut
	{
		let n = space.size();
		assert_eq!(neighbours.len(),n,"neighbour table must have one entry per address");
		let mut distances = Matrix::constant(UNREACHABLE,n,n);
		for source in 0..n
		{
			Self::bfs_fill(source,neighbours,&mut distances);
		}
		DistanceLut{ space, distances }
	}
	fn bfs_fill(source: usize, neighbours: &[Vec<usize>], distances: &mut Matrix<u32>)
	{
		*distances.get_mut(source,source) = 0;
		let mut queue = VecDeque::new();
		queue.push_back(source);
		while let Some(current) = queue.pop_front()
		{
			let current_distance = *distances.get(source,current);
			for &next in &neighbours[current]
			{
				if *distances.get(source,next)==UNREACHABLE
				{
					*distances.get_mut(source,next) = current_distance+1;
					queue.push_back(next);
				}
			}
		}
	}
	fn neighbours_from_top_level(top: &TopLevel) -> Vec<Vec<usize>>
	{
		let space = top.address_space();
		let n = space.size();
		let mut neighbours = vec![Vec::new();n];
		for (address,tile) in top.tiles()
		{
			let from_index = space.pack(address);
			let mut targets = Vec::new();
			Self::collect_cross_tile_targets(tile,address,&mut targets);
			for target in targets
			{
				let to_index = space.pack(&target);
				if !neighbours[from_index].contains(&to_index)
				{
					neighbours[from_index].push(to_index);
				}
			}
		}
		neighbours
	}
	fn collect_cross_tile_targets(component: &crate::arch::Component, own_address: &Address, out: &mut Vec<Address>)
	{
		for link in component.links()
		{
			for path in link.sources.iter().chain(link.sinks.iter())
			{
				if let Some(address) = path.address()
				{
					if address!=own_address
					{
						out.push(address.clone());
					}
				}
			}
		}
		for (_,child) in component.children()
		{
			Self::collect_cross_tile_targets(child,own_address,out);
		}
	}
	/// Hop distance between two addresses, O(1).
	pub fn distance(&self, source: &Address, target: &Address) -> u32
	{
		self.distance_by_index(self.space.pack(source),self.space.pack(target))
	}
	/// Hop distance between two packed address indices, O(1).
	pub fn distance_by_index(&self, source: usize, target: usize) -> u32
	{
		*self.distances.get(source,target)
	}
	pub fn is_reachable(&self, source: &Address, target: &Address) -> bool
	{
		self.distance(source,target)!=UNREACHABLE
	}
	pub fn address_space(&self) -> &AddressSpace
	{
		&self.space
	}
}

impl Quantifiable for DistanceLut
{
	fn total_memory(&self) -> usize
	{
		size_of::<DistanceLut>()+self.distances.total_memory()
	}
}
