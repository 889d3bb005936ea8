/*!

Component C: placement state. Owns the nodes, channels, map table,
distance LUT, and grid that the SA driver mutates in place. Every mutation
routes through [`PlacementState::assign`], [`PlacementState::move_node`],
or [`PlacementState::swap`] so the grid-node consistency invariant (§3,
§8 invariant 1) never goes stale between a node's location and the grid.

*/

use std::mem::size_of;
use crate::arch::TopLevel;
use crate::distance::DistanceLut;
use crate::error::Error;
use crate::maptable::{ClassAssignment,ClassId,MapTable,PathTable};
use crate::placement::sa::PlaceOptions;
use crate::quantify::Quantifiable;
use crate::ruleset::RuleSet;
use crate::taskgraph::Taskgraph;

/// A concrete slot: an address index plus a slot index into that address's `PathTable` entry.
/// In the flat regime every address has at most one slot, so `slot_index` is always `0`; the
/// representation is shared between the flat and non-flat regimes (§9 "flat optimization") so
/// the hot loop never branches on which regime is active.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub struct Location
{
	pub address_index: usize,
	pub slot_index: usize,
}

impl Location
{
	pub fn new(address_index: usize, slot_index: usize) -> Location
	{
		Location{ address_index, slot_index }
	}
}

/// A task placed by the SA driver.
#[derive(Clone,Debug)]
pub struct SaNode
{
	pub location: Location,
	pub class: ClassId,
	pub out_channels: Vec<usize>,
	pub in_channels: Vec<usize>,
}

/// A routable connection between nodes, corresponding to one task-graph edge.
#[derive(Clone,Debug)]
pub enum SaChannel
{
	TwoChannel{ src: usize, dst: usize },
	MultiChannel{ srcs: Vec<usize>, sinks: Vec<usize> },
}

impl SaChannel
{
	/// Every node index touched by this channel, source or sink.
	pub fn endpoints(&self) -> Vec<usize>
	{
		match self
		{
			SaChannel::TwoChannel{src,dst} => vec![*src,*dst],
			SaChannel::MultiChannel{srcs,sinks} =>
			{
				let mut v = srcs.clone();
				v.extend(sinks.iter().copied());
				v
			},
		}
	}
}

/// Dense occupancy array over `(address_index, slot_index)`. `None` means empty; otherwise the
/// index of the occupying node.
#[derive(Clone,Debug)]
pub struct Grid
{
	slots_per_address: usize,
	cells: Vec<Option<usize>>,
}

impl Grid
{
	pub fn new(num_addresses: usize, slots_per_address: usize) -> Grid
	{
		Grid{ slots_per_address, cells: vec![None;num_addresses*slots_per_address] }
	}
	fn index_of(&self, location: Location) -> usize
	{
		location.address_index*self.slots_per_address+location.slot_index
	}
	pub fn occupant(&self, location: Location) -> Option<usize>
	{
		self.cells[self.index_of(location)]
	}
	fn set(&mut self, location: Location, occupant: Option<usize>)
	{
		let index = self.index_of(location);
		self.cells[index] = occupant;
	}
	/// Bypasses `PlacementState`'s mutators to directly corrupt a cell, for verifier tests only.
	pub fn set_for_test(&mut self, location: Location, occupant: Option<usize>)
	{
		self.set(location,occupant);
	}
	pub fn slots_per_address(&self) -> usize
	{
		self.slots_per_address
	}
}

impl Quantifiable for Location
{
	fn total_memory(&self) -> usize
	{
		size_of::<Location>()
	}
}

impl Quantifiable for SaNode
{
	fn total_memory(&self) -> usize
	{
		size_of::<SaNode>()+self.out_channels.total_memory()+self.in_channels.total_memory()
	}
}

impl Quantifiable for SaChannel
{
	fn total_memory(&self) -> usize
	{
		size_of::<SaChannel>()+match self
		{
			SaChannel::TwoChannel{..} => 0,
			SaChannel::MultiChannel{srcs,sinks} => srcs.total_memory()+sinks.total_memory(),
		}
	}
}

impl Quantifiable for Grid
{
	fn total_memory(&self) -> usize
	{
		size_of::<Grid>()+self.cells.total_memory()
	}
}

/// Owns the full mutable placement state: nodes, channels, the map table, the distance LUT, the
/// grid, and the optional address-cost/aux-cost hooks of §4.E. Exposes the only four mutators
/// (`assign`, `move_node`, `swap`, plus their shared bookkeeping) through which the grid and
/// node locations can change, so the two never drift apart.
pub struct PlacementState
{
	pub nodes: Vec<SaNode>,
	pub channels: Vec<SaChannel>,
	pub map_table: MapTable,
	pub path_table: PathTable,
	pub distance: DistanceLut,
	pub grid: Grid,
	/// Optional per-location penalty (`address_index -> cost`), populated when
	/// `PlaceOptions::enable_address` is set.
	pub address_data: Option<Vec<f64>>,
	/// Optional global scalar cost derived from the full state, callable only in full-map
	/// contexts (never inside a single trial's delta computation).
	pub aux: Option<Box<dyn Fn(&PlacementState) -> f64>>,
}

impl PlacementState
{
	/// Wires Components A (distance LUT) and B (path/map tables) together and translates the
	/// task graph into nodes and channels, so a caller only has to supply `(top, taskgraph,
	/// rules)` (§6 `place(map, options)`) instead of hand-building every intermediate table.
	/// Every node starts at the placeholder location `(0, 0)` with the grid left empty; the
	/// caller is expected to run [`crate::placement::sa::initial_placement`] immediately
	/// afterwards to seat every node onto a legal, collision-free slot.
	pub fn build(top: &TopLevel, taskgraph: &Taskgraph, rules: &dyn RuleSet, options: &PlaceOptions) -> Result<PlacementState,Error>
	{
		let distance = DistanceLut::build(top);
		let path_table = PathTable::build(top,rules);
		let classes = ClassAssignment::build(taskgraph,rules);
		let map_table = MapTable::build(top,taskgraph,&path_table,&classes,rules)?;

		let natural_slots_per_address = (0..path_table.address_space().size()).map(|i|path_table.slot_count(i)).max().unwrap_or(0).max(1);
		let slots_per_address = if options.enable_flatness { natural_slots_per_address } else { natural_slots_per_address.max(2) };
		let grid = Grid::new(path_table.address_space().size(),slots_per_address);

		let (nodes,channels) = Self::translate_taskgraph(taskgraph,&classes);

		let address_data = if options.enable_address { Some(vec![0.0;path_table.address_space().size()]) } else { None };

		Ok(PlacementState{ nodes, channels, map_table, path_table, distance, grid, address_data, aux: None })
	}

	fn translate_taskgraph(taskgraph: &Taskgraph, classes: &ClassAssignment) -> (Vec<SaNode>,Vec<SaChannel>)
	{
		let channels: Vec<SaChannel> = (0..taskgraph.num_edges()).map(|i|
		{
			let edge = taskgraph.edge(i);
			if edge.is_point_to_point()
			{
				let src = taskgraph.node_index(&edge.sources[0]).expect("edge source must name an existing node");
				let dst = taskgraph.node_index(&edge.sinks[0]).expect("edge sink must name an existing node");
				SaChannel::TwoChannel{ src, dst }
			}
			else
			{
				let srcs = edge.sources.iter().map(|n|taskgraph.node_index(n).expect("edge source must name an existing node")).collect();
				let sinks = edge.sinks.iter().map(|n|taskgraph.node_index(n).expect("edge sink must name an existing node")).collect();
				SaChannel::MultiChannel{ srcs, sinks }
			}
		}).collect();

		let nodes: Vec<SaNode> = (0..taskgraph.num_nodes()).map(|i| SaNode
		{
			location: Location::new(0,0),
			class: classes.class_of(i),
			out_channels: taskgraph.out_edges(i).to_vec(),
			in_channels: taskgraph.in_edges(i).to_vec(),
		}).collect();

		(nodes,channels)
	}

	pub fn new(nodes: Vec<SaNode>, channels: Vec<SaChannel>, map_table: MapTable, path_table: PathTable, distance: DistanceLut) -> PlacementState
	{
		let slots_per_address = (0..path_table.address_space().size()).map(|i|path_table.slot_count(i)).max().unwrap_or(0).max(1);
		let grid = Grid::new(path_table.address_space().size(),slots_per_address);
		let mut state = PlacementState{ nodes, channels, map_table, path_table, distance, grid, address_data: None, aux: None };
		for i in 0..state.nodes.len()
		{
			let location = state.nodes[i].location;
			state.grid.set(location,Some(i));
		}
		state
	}
	pub fn location(&self, node_index: usize) -> Location
	{
		self.nodes[node_index].location
	}
	pub fn get_class(&self, node_index: usize) -> ClassId
	{
		self.nodes[node_index].class
	}
	pub fn is_legal(&self, node_index: usize, location: Location) -> bool
	{
		self.map_table.is_legal(self.get_class(node_index),location.address_index,location.slot_index)
	}
	/// Place a currently-occupied slot's node at `location`, which must be empty.
	pub fn assign(&mut self, node_index: usize, location: Location)
	{
		assert!(self.grid.occupant(location).is_none(),"assign onto an occupied slot");
		self.grid.set(location,Some(node_index));
		self.nodes[node_index].location = location;
	}
	/// Move a node to an empty `location`, vacating its previous cell.
	pub fn move_node(&mut self, node_index: usize, location: Location)
	{
		assert!(self.grid.occupant(location).is_none(),"move_node onto an occupied slot");
		let previous = self.nodes[node_index].location;
		self.grid.set(previous,None);
		self.grid.set(location,Some(node_index));
		self.nodes[node_index].location = location;
	}
	/// Swap the locations of two distinct nodes.
	pub fn swap(&mut self, a: usize, b: usize)
	{
		assert_ne!(a,b,"swap requires two distinct nodes");
		let location_a = self.nodes[a].location;
		let location_b = self.nodes[b].location;
		self.grid.set(location_a,Some(b));
		self.grid.set(location_b,Some(a));
		self.nodes[a].location = location_b;
		self.nodes[b].location = location_a;
	}
}

impl Quantifiable for PlacementState
{
	// `aux` is an opaque closure and is not accounted for; its capture size is not introspectable.
	fn total_memory(&self) -> usize
	{
		size_of::<PlacementState>()
			+self.nodes.total_memory()
			+self.channels.total_memory()
			+self.map_table.total_memory()
			+self.path_table.total_memory()
			+self.distance.total_memory()
			+self.grid.total_memory()
			+self.address_data.total_memory()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::address::AddressSpace;
	use crate::maptable::ClassId;

	fn trivial_map_table() -> (MapTable,PathTable)
	{
		use crate::arch::{Component,Direction,Port,TopLevel};
		use crate::ruleset::DefaultRuleSet;
		use crate::taskgraph::{Taskgraph,TaskgraphEdge,TaskgraphNode};
		let mut top = TopLevel::new("top",AddressSpace::new(vec![2]));
		for address in top.address_space().iter().collect::<Vec<_>>()
		{
			let mut tile = Component::new("tile").with_primitive("tile");
			tile.add_port(Port::new("p",Direction::Input)).unwrap();
			top.set_tile(address,tile).unwrap();
		}
		let rules = DefaultRuleSet;
		let path_table = PathTable::build(&top,&rules);
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("b")];
		let taskgraph = Taskgraph::build(nodes,vec![TaskgraphEdge::point_to_point("a","b")]).unwrap();
		let classes = crate::maptable::ClassAssignment::build(&taskgraph,&rules);
		let map_table = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap();
		(map_table,path_table)
	}

	#[test]
	fn swap_then_swap_restores_locations()
	{
		let (map_table,path_table) = trivial_map_table();
		let distance = DistanceLut::from_neighbours(path_table.address_space().clone(),&[vec![1],vec![0]]);
		let nodes = vec![
			SaNode{ location: Location::new(0,0), class: ClassId::Normal(0), out_channels: vec![0], in_channels: vec![] },
			SaNode{ location: Location::new(1,0), class: ClassId::Normal(0), out_channels: vec![], in_channels: vec![0] },
		];
		let channels = vec![SaChannel::TwoChannel{ src: 0, dst: 1 }];
		let mut state = PlacementState::new(nodes,channels,map_table,path_table,distance);
		let original: Vec<Location> = state.nodes.iter().map(|n|n.location).collect();
		state.swap(0,1);
		state.swap(0,1);
		let restored: Vec<Location> = state.nodes.iter().map(|n|n.location).collect();
		assert_eq!(original,restored);
	}

	#[test]
	fn grid_consistency_after_move()
	{
		let (map_table,path_table) = trivial_map_table();
		let distance = DistanceLut::from_neighbours(path_table.address_space().clone(),&[vec![1],vec![0]]);
		let nodes = vec![SaNode{ location: Location::new(0,0), class: ClassId::Normal(0), out_channels: vec![], in_channels: vec![] }];
		let mut state = PlacementState::new(nodes,vec![],map_table,path_table,distance);
		state.move_node(0,Location::new(1,0));
		assert_eq!(state.grid.occupant(Location::new(0,0)),None);
		assert_eq!(state.grid.occupant(Location::new(1,0)),Some(0));
		assert_eq!(state.location(0),Location::new(1,0));
	}
}
