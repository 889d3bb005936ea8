/*!

Component B: path/map tables. A [`PathTable`] enumerates, per address, the
ordered list of mappable component paths inside that tile. A [`MapTable`]
then records, for every task equivalence class, which (address, slot)
pairs that class may occupy — the table the move generator and cost model
consult on every SA trial, so it must answer in O(1) (spec §4.B).

*/

use std::collections::BTreeMap;
use std::mem::size_of;
use std::rc::Rc;
use crate::address::{Address,AddressSpace};
use crate::arch::{Component,Path,TopLevel};
use crate::error::Error;
use crate::quantify::Quantifiable;
use crate::ruleset::RuleSet;
use crate::taskgraph::Taskgraph;

/// For every address, the ordered list of mappable component paths inside that tile, found by a
/// DFS walk of the tile's child components filtered by [`RuleSet::is_mappable`]. Identical tiles
/// (byte-for-byte identical path lists) share a single interned `Rc<Vec<Path>>`.
#[derive(Debug)]
pub struct PathTable
{
	space: AddressSpace,
	per_address: Vec<Rc<Vec<Path>>>,
}

impl PathTable
{
	pub fn build(top: &TopLevel, rules: &dyn RuleSet) -> PathTable
	{
		let space = top.address_space().clone();
		let mut intern: BTreeMap<Vec<Path>,Rc<Vec<Path>>> = BTreeMap::new();
		let mut per_address = Vec::with_capacity(space.size());
		for index in 0..space.size()
		{
			let address = space.unpack(index);
			let mut paths = Vec::new();
			if let Some(tile) = top.tile(&address)
			{
				Self::dfs(tile,&address,Vec::new(),rules,&mut paths);
			}
			let interned = intern.entry(paths.clone()).or_insert_with(||Rc::new(paths)).clone();
			per_address.push(interned);
		}
		PathTable{ space, per_address }
	}
	fn dfs(component: &Component, address: &Address, steps: Vec<String>, rules: &dyn RuleSet, out: &mut Vec<Path>)
	{
		// Fires the construction-time annotation hook for every visited component; the core
		// never reads the result, it exists purely for a rule set's own side effects.
		let _ = rules.annotate(component);
		if rules.is_mappable(component)
		{
			out.push(Path::at_address(address.clone(),steps.clone()));
		}
		for (name,child) in component.children()
		{
			let mut child_steps = steps.clone();
			child_steps.push(name.clone());
			Self::dfs(child,address,child_steps,rules,out);
		}
	}
	pub fn slots_at(&self, address_index: usize) -> &[Path]
	{
		&self.per_address[address_index]
	}
	pub fn slot_count(&self, address_index: usize) -> usize
	{
		self.per_address[address_index].len()
	}
	pub fn address_space(&self) -> &AddressSpace
	{
		&self.space
	}
	/// Whether every address has at most one mappable slot — a precondition for the flat regime.
	pub fn is_flat(&self) -> bool
	{
		(0..self.space.size()).all(|i|self.slot_count(i)<=1)
	}
}

impl Quantifiable for PathTable
{
	fn total_memory(&self) -> usize
	{
		size_of::<PathTable>()+self.per_address.iter().map(|paths|paths.len()*size_of::<Path>()).sum::<usize>()
	}
}

/// Identifies the equivalence class of a task node: either a normal class, sharing the ordinary
/// map-table, or a special class, which additionally carries an explicit address whitelist.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum ClassId
{
	Normal(usize),
	Special(usize),
}

/// Partitions task nodes into equivalence classes via [`RuleSet::is_equivalent`], separating out
/// those matching [`RuleSet::is_special`] into their own, separately indexed partition (§4.B).
#[derive(Debug)]
pub struct ClassAssignment
{
	class_of_node: Vec<ClassId>,
	normal_representatives: Vec<usize>,
	special_representatives: Vec<usize>,
}

impl ClassAssignment
{
	pub fn build(taskgraph: &Taskgraph, rules: &dyn RuleSet) -> ClassAssignment
	{
		let mut normal_representatives = Vec::new();
		let mut special_representatives = Vec::new();
		let mut class_of_node = Vec::with_capacity(taskgraph.num_nodes());
		for i in 0..taskgraph.num_nodes()
		{
			let node = taskgraph.node(i);
			let class = if rules.is_special(node)
			{
				let found = special_representatives.iter().position(|&r|rules.is_equivalent(taskgraph.node(r),node));
				let class_index = found.unwrap_or_else(||{ special_representatives.push(i); special_representatives.len()-1 });
				ClassId::Special(class_index)
			}
			else
			{
				let found = normal_representatives.iter().position(|&r|rules.is_equivalent(taskgraph.node(r),node));
				let class_index = found.unwrap_or_else(||{ normal_representatives.push(i); normal_representatives.len()-1 });
				ClassId::Normal(class_index)
			};
			class_of_node.push(class);
		}
		ClassAssignment{ class_of_node, normal_representatives, special_representatives }
	}
	pub fn class_of(&self, node_index: usize) -> ClassId
	{
		self.class_of_node[node_index]
	}
	pub fn num_normal_classes(&self) -> usize
	{
		self.normal_representatives.len()
	}
	pub fn num_special_classes(&self) -> usize
	{
		self.special_representatives.len()
	}
}

/// Class -> (address -> allowed slot indices), plus, for special classes, an explicit address
/// vector for direct random draw by the restricted move generator (§4.D).
#[derive(Debug)]
pub struct MapTable
{
	space: AddressSpace,
	/// `normal_slots[class][address_index]` is the sorted list of valid slot indices.
	normal_slots: Vec<Vec<Vec<usize>>>,
	/// `special_slots[class][address_index]` mirrors `normal_slots` for special classes.
	special_slots: Vec<Vec<Vec<usize>>>,
	/// `special_addresses[class]` lists every address index with at least one valid slot.
	special_addresses: Vec<Vec<usize>>,
	flat: bool,
}

impl MapTable
{
	/// Builds the table, rejecting the architecture up front if a normal class has nowhere to map
	/// at all: an empty mappable set for a normal class is an architecture/rule-set mismatch
	/// (§7 `ConstructionError`), distinct from a special class's whitelist running dry during
	/// seating (`PlacementInfeasible`, only discoverable once placement starts).
	pub fn build(top: &TopLevel, taskgraph: &Taskgraph, path_table: &PathTable, classes: &ClassAssignment, rules: &dyn RuleSet) -> Result<MapTable,Error>
	{
		let space = path_table.address_space().clone();
		let mut normal_slots = vec![vec![Vec::new();space.size()];classes.num_normal_classes()];
		let mut special_slots = vec![vec![Vec::new();space.size()];classes.num_special_classes()];
		let mut special_addresses = vec![Vec::new();classes.num_special_classes()];

		// Pick one representative node per class to query `can_map` against every slot.
		let mut normal_reps: Vec<Option<usize>> = vec![None;classes.num_normal_classes()];
		let mut special_reps: Vec<Option<usize>> = vec![None;classes.num_special_classes()];
		for node_index in 0..taskgraph.num_nodes()
		{
			match classes.class_of(node_index)
			{
				ClassId::Normal(c) => { normal_reps[c].get_or_insert(node_index); },
				ClassId::Special(c) => { special_reps[c].get_or_insert(node_index); },
			}
		}

		for (class_index,representative) in normal_reps.iter().enumerate()
		{
			let Some(&node_index) = representative.as_ref() else { continue };
			let node = taskgraph.node(node_index);
			for address_index in 0..space.size()
			{
				let address = space.unpack(address_index);
				let slots = path_table.slots_at(address_index);
				for (slot_index,slot_path) in slots.iter().enumerate()
				{
					if let Some(component) = top.resolve(slot_path)
					{
						if rules.can_map(node,component)
						{
							normal_slots[class_index][address_index].push(slot_index);
						}
					}
				}
				let _ = &address;
			}
		}
		for (class_index,representative) in special_reps.iter().enumerate()
		{
			let Some(&node_index) = representative.as_ref() else { continue };
			let node = taskgraph.node(node_index);
			for address_index in 0..space.size()
			{
				let slots = path_table.slots_at(address_index);
				for (slot_index,slot_path) in slots.iter().enumerate()
				{
					if let Some(component) = top.resolve(slot_path)
					{
						if rules.can_map(node,component)
						{
							special_slots[class_index][address_index].push(slot_index);
						}
					}
				}
				if !special_slots[class_index][address_index].is_empty()
				{
					special_addresses[class_index].push(address_index);
				}
			}
		}

		for (class_index,representative) in normal_reps.iter().enumerate()
		{
			if representative.is_none()
			{
				continue;
			}
			if normal_slots[class_index].iter().all(|slots|slots.is_empty())
			{
				return Err(Error::Construction(format!("normal class {class_index} has no mappable slot at any address")));
			}
		}

		let flat = path_table.is_flat()
			&& normal_slots.iter().all(|per_address|per_address.iter().all(|slots|slots.len()<=1))
			&& special_slots.iter().all(|per_address|per_address.iter().all(|slots|slots.len()<=1));

		Ok(MapTable{ space, normal_slots, special_slots, special_addresses, flat })
	}
	pub fn is_flat(&self) -> bool
	{
		self.flat
	}
	pub fn valid_slots(&self, class: ClassId, address_index: usize) -> &[usize]
	{
		match class
		{
			ClassId::Normal(c) => &self.normal_slots[c][address_index],
			ClassId::Special(c) => &self.special_slots[c][address_index],
		}
	}
	/// Addresses with at least one valid slot for a special class, for direct random draw.
	pub fn special_address_indices(&self, class_index: usize) -> &[usize]
	{
		&self.special_addresses[class_index]
	}
	pub fn is_legal(&self, class: ClassId, address_index: usize, slot_index: usize) -> bool
	{
		self.valid_slots(class,address_index).contains(&slot_index)
	}
	pub fn address_space(&self) -> &AddressSpace
	{
		&self.space
	}
	/// Prunes a special class's address list to exactly `allowed`, for tests exercising a
	/// restricted-move scenario without writing a full `can_map` implementation.
	pub fn restrict_special_class_for_test(&mut self, class_index: usize, allowed: &[usize])
	{
		self.special_addresses[class_index].retain(|a|allowed.contains(a));
		for address_index in 0..self.space.size()
		{
			if !allowed.contains(&address_index)
			{
				self.special_slots[class_index][address_index].clear();
			}
		}
	}
}

impl Quantifiable for MapTable
{
	fn total_memory(&self) -> usize
	{
		size_of::<MapTable>()
			+self.normal_slots.total_memory()
			+self.special_slots.total_memory()
			+self.special_addresses.total_memory()
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::address::AddressSpace;
	use crate::arch::{Direction,Port};
	use crate::ruleset::DefaultRuleSet;
	use crate::taskgraph::{TaskgraphEdge,TaskgraphNode};

	fn tiny_top_level() -> TopLevel
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![2]));
		for address in top.address_space().iter().collect::<Vec<_>>()
		{
			let mut tile = Component::new("tile").with_primitive("tile");
			tile.add_port(Port::new("in",Direction::Input)).unwrap();
			top.set_tile(address,tile).unwrap();
		}
		top
	}

	#[test]
	fn flat_regime_with_one_slot_per_tile()
	{
		let top = tiny_top_level();
		let rules = DefaultRuleSet;
		let path_table = PathTable::build(&top,&rules);
		assert!(path_table.is_flat());
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("b")];
		let taskgraph = Taskgraph::build(nodes,vec![TaskgraphEdge::point_to_point("a","b")]).unwrap();
		let classes = ClassAssignment::build(&taskgraph,&rules);
		assert_eq!(classes.num_normal_classes(),1,"DefaultRuleSet::is_equivalent is always true");
		let map_table = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap();
		assert!(map_table.is_flat());
		assert_eq!(map_table.valid_slots(ClassId::Normal(0),0),&[0]);
	}

	#[test]
	fn a_normal_class_with_no_mappable_slot_anywhere_is_a_construction_error()
	{
		struct NothingMappable;
		impl std::fmt::Debug for NothingMappable
		{
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f,"NothingMappable") }
		}
		impl RuleSet for NothingMappable
		{
			fn is_mappable(&self, _component: &Component) -> bool { false }
		}

		let top = tiny_top_level();
		let rules = NothingMappable;
		let path_table = PathTable::build(&top,&rules);
		assert_eq!(path_table.slot_count(0),0);
		let nodes = vec![TaskgraphNode::new("a"),TaskgraphNode::new("b")];
		let taskgraph = Taskgraph::build(nodes,vec![TaskgraphEdge::point_to_point("a","b")]).unwrap();
		let classes = ClassAssignment::build(&taskgraph,&rules);
		let error = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap_err();
		assert!(matches!(error,Error::Construction(_)));
	}
}
