/*!

Component D: the move generator. `propose` is a pull interface — no
language-level coroutine is needed, per spec §9 "Generators/coroutines" —
that the SA driver calls once per trial to get a candidate target location,
or `None` if no move is available under the current radius.

*/

use std::collections::HashMap;
use std::rc::Rc;
use rand::Rng;
use rand::rngs::StdRng;
use crate::maptable::ClassId;
use crate::placement::state::{Location,PlacementState};

/// `propose(rng, node_index, radius) -> Option<Location>`.
pub trait MoveGenerator
{
	fn propose(&mut self, state: &PlacementState, rng: &mut StdRng, node_index: usize, radius: i64) -> Option<Location>;
}

/// The reference, uncached move generator: recomputes the eligible address set from scratch on
/// every call. `O(number of addresses)` per trial; [`CachedMoveGenerator`] wraps this to amortize
/// that cost across trials sharing a (class, address, radius) key.
#[derive(Debug,Default)]
pub struct UncachedMoveGenerator;

impl UncachedMoveGenerator
{
	/// Every address index within L∞ radius `r` of `origin` that has at least one valid slot for
	/// `class` (normal strategy), or every whitelisted address of a special class within radius
	/// (special strategy).
	fn eligible_addresses(state: &PlacementState, class: ClassId, origin: usize, radius: i64) -> Vec<usize>
	{
		let space = state.path_table.address_space();
		let origin_address = space.unpack(origin);
		match class
		{
			ClassId::Normal(_) => (0..space.size())
				.filter(|&a|
				{
					let address = space.unpack(a);
					origin_address.chebyshev_distance(&address)<=radius && !state.map_table.valid_slots(class,a).is_empty()
				})
				.collect(),
			ClassId::Special(c) => state.map_table.special_address_indices(c).iter()
				.copied()
				.filter(|&a|
				{
					let address = space.unpack(a);
					origin_address.chebyshev_distance(&address)<=radius
				})
				.collect(),
		}
	}
}

impl MoveGenerator for UncachedMoveGenerator
{
	fn propose(&mut self, state: &PlacementState, rng: &mut StdRng, node_index: usize, radius: i64) -> Option<Location>
	{
		let class = state.get_class(node_index);
		let origin = state.location(node_index).address_index;
		let candidates = Self::eligible_addresses(state,class,origin,radius);
		if candidates.is_empty()
		{
			return None;
		}
		let address_index = candidates[rng.gen_range(0..candidates.len())];
		let slots = state.map_table.valid_slots(class,address_index);
		let slot_index = slots[rng.gen_range(0..slots.len())];
		Some(Location::new(address_index,slot_index))
	}
}

struct CacheEntry
{
	radius: i64,
	candidates: Rc<Vec<usize>>,
}

/// Precomputes, per `(class, current address, radius)`, the eligible destination list, so
/// repeated trials at the same radius skip the O(number of addresses) mask intersection.
///
/// Invalidation: the cache is keyed by `(class, address)`, and rebuilt whenever the requested
/// radius differs at all from the cached one — not only on decrease. A decrease-only policy (as
/// one early version of this generator used) under-invalidates on radius *increase*: a larger
/// ball admits addresses the smaller ball's cached list never considered, so reusing it would
/// silently drop legal candidates. See DESIGN.md for this decision.
#[derive(Default)]
pub struct CachedMoveGenerator
{
	inner: UncachedMoveGenerator,
	cache: HashMap<(ClassId,usize),CacheEntry>,
}

impl CachedMoveGenerator
{
	pub fn new() -> CachedMoveGenerator
	{
		CachedMoveGenerator{ inner: UncachedMoveGenerator, cache: HashMap::new() }
	}
}

impl MoveGenerator for CachedMoveGenerator
{
	fn propose(&mut self, state: &PlacementState, rng: &mut StdRng, node_index: usize, radius: i64) -> Option<Location>
	{
		let class = state.get_class(node_index);
		let origin = state.location(node_index).address_index;
		let key = (class,origin);
		let needs_rebuild = match self.cache.get(&key)
		{
			Some(entry) => entry.radius!=radius,
			None => true,
		};
		if needs_rebuild
		{
			let candidates = UncachedMoveGenerator::eligible_addresses(state,class,origin,radius);
			self.cache.insert(key,CacheEntry{ radius, candidates: Rc::new(candidates) });
		}
		let candidates = self.cache.get(&key).expect("just inserted").candidates.clone();
		if candidates.is_empty()
		{
			return None;
		}
		let address_index = candidates[rng.gen_range(0..candidates.len())];
		let slots = state.map_table.valid_slots(class,address_index);
		let slot_index = slots[rng.gen_range(0..slots.len())];
		Some(Location::new(address_index,slot_index))
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use rand::SeedableRng;
	use crate::address::AddressSpace;
	use crate::arch::{Component,Direction,Port,TopLevel};
	use crate::distance::DistanceLut;
	use crate::maptable::{ClassAssignment,MapTable,PathTable};
	use crate::placement::state::{PlacementState,SaNode};
	use crate::ruleset::DefaultRuleSet;
	use crate::taskgraph::{Taskgraph,TaskgraphNode};

	fn line_state(n: usize) -> PlacementState
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![n as i64]));
		for address in top.address_space().iter().collect::<Vec<_>>()
		{
			let mut tile = Component::new("tile").with_primitive("tile");
			tile.add_port(Port::new("p",Direction::Input)).unwrap();
			top.set_tile(address,tile).unwrap();
		}
		let rules = DefaultRuleSet;
		let path_table = PathTable::build(&top,&rules);
		let nodes: Vec<TaskgraphNode> = (0..n).map(|i|TaskgraphNode::new(format!("t{i}"))).collect();
		let taskgraph = Taskgraph::build(nodes,vec![]).unwrap();
		let classes = ClassAssignment::build(&taskgraph,&rules);
		let map_table = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap();
		let mut neighbours = vec![Vec::new();n];
		for i in 0..n.saturating_sub(1)
		{
			neighbours[i].push(i+1);
			neighbours[i+1].push(i);
		}
		let distance = DistanceLut::from_neighbours(path_table.address_space().clone(),&neighbours);
		let sa_nodes: Vec<SaNode> = (0..n).map(|i|SaNode{
			location: crate::placement::state::Location::new(i,0),
			class: crate::maptable::ClassId::Normal(0),
			out_channels: vec![],
			in_channels: vec![],
		}).collect();
		PlacementState::new(sa_nodes,vec![],map_table,path_table,distance)
	}

	#[test]
	fn cached_and_uncached_agree_on_candidate_set()
	{
		let state = line_state(6);
		let mut rng = StdRng::seed_from_u64(1);
		let mut cached = CachedMoveGenerator::new();
		let mut uncached = UncachedMoveGenerator;
		for _ in 0..50
		{
			let a = cached.propose(&state,&mut rng,2,2);
			let b = uncached.propose(&state,&mut StdRng::seed_from_u64(1),2,2);
			// Both must either always find a candidate or never, for the same radius.
			assert_eq!(a.is_some(),b.is_some());
		}
	}

	#[test]
	fn zero_radius_only_proposes_own_address()
	{
		let state = line_state(6);
		let mut rng = StdRng::seed_from_u64(7);
		let mut gen = CachedMoveGenerator::new();
		for _ in 0..20
		{
			if let Some(location) = gen.propose(&state,&mut rng,3,0)
			{
				assert_eq!(location.address_index,3);
			}
		}
	}
}
