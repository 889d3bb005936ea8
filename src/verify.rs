/*!

Component J: verifiers. Independent, read-only checks of the invariants
the SA driver (§8 invariant 1) and Pathfinder are expected to maintain by
construction — run after the fact so a latent bug in either engine is
caught as a reported [`crate::error::Error`] instead of silently
corrupting a map's output.

*/

use std::collections::HashSet;
use crate::error::Error;
use crate::placement::state::PlacementState;
use crate::routing::channels::RoutingChannel;
use crate::routing::graph::RoutingGraph;
use crate::ruleset::RuleSet;

/// (i) every node is recorded at its own `grid[location]`; (ii) no two nodes share a slot;
/// (iii) every `(node, location)` is legal under the map table (which is itself built from
/// `can_map`, §4.B).
pub fn verify_placement(state: &PlacementState) -> Result<(),Error>
{
	let mut offending = Vec::new();
	for node_index in 0..state.nodes.len()
	{
		let location = state.location(node_index);
		if state.grid.occupant(location)!=Some(node_index)
		{
			offending.push(node_index);
			continue;
		}
		if !state.is_legal(node_index,location)
		{
			offending.push(node_index);
		}
	}
	if !offending.is_empty()
	{
		return Err(Error::PlacementInconsistency{ message: "grid/location mismatch or illegal slot".to_string(), offending_nodes: offending });
	}

	// No two nodes may share a slot: since `grid.occupant` already enforces this for nodes whose
	// own location check passed above, a second pass over all occupied cells confirms no stray
	// duplicate recording exists.
	let mut seen = HashSet::new();
	for node in &state.nodes
	{
		if !seen.insert((node.location.address_index,node.location.slot_index))
		{
			return Err(Error::PlacementInconsistency{ message: "two nodes share a slot".to_string(), offending_nodes: vec![] });
		}
	}
	Ok(())
}

/// (i) every channel's installed subgraph touches at least one vertex of every start and stop
/// group; (ii) every vertex in the subgraph satisfies `can_use`; (iii) no vertex is over capacity.
pub fn verify_routing(graph: &RoutingGraph, channels: &[RoutingChannel], routes: &[HashSet<usize>], rules: &dyn RuleSet) -> Result<(),Error>
{
	for (channel,route) in channels.iter().zip(routes.iter())
	{
		for group in channel.start_groups.iter().chain(channel.stop_groups.iter())
		{
			if !group.iter().any(|v|route.contains(v))
			{
				return Err(Error::RoutingConnectivity{ channel_index: channel.edge_index, message: "installed route does not touch a required start/stop group".to_string() });
			}
		}
		for &v in route
		{
			if !rules.can_use(graph.vertex_path(v),channel.edge_index)
			{
				return Err(Error::RoutingConnectivity{ channel_index: channel.edge_index, message: format!("route uses vertex {} forbidden by can_use",graph.vertex_path(v)) });
			}
		}
	}
	let overused = (0..graph.num_vertices()).filter(|&v|graph.link(v).is_overused()).count();
	if overused>0
	{
		return Err(Error::RoutingCongestion{ iterations: 0, overused_vertices: overused });
	}
	Ok(())
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::address::AddressSpace;
	use crate::arch::{Component,Direction,Port,TopLevel};
	use crate::distance::DistanceLut;
	use crate::maptable::{ClassAssignment,ClassId,MapTable,PathTable};
	use crate::placement::state::{Location,SaNode};
	use crate::ruleset::DefaultRuleSet;
	use crate::taskgraph::{Taskgraph,TaskgraphNode};

	fn two_tile_state() -> PlacementState
	{
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
		let taskgraph = Taskgraph::build(nodes,vec![]).unwrap();
		let classes = ClassAssignment::build(&taskgraph,&rules);
		let map_table = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap();
		let distance = DistanceLut::from_neighbours(path_table.address_space().clone(),&[vec![1],vec![0]]);
		let sa_nodes = vec![
			SaNode{ location: Location::new(0,0), class: ClassId::Normal(0), out_channels: vec![], in_channels: vec![] },
			SaNode{ location: Location::new(1,0), class: ClassId::Normal(0), out_channels: vec![], in_channels: vec![] },
		];
		PlacementState::new(sa_nodes,vec![],map_table,path_table,distance)
	}

	#[test]
	fn well_formed_placement_passes()
	{
		let state = two_tile_state();
		assert!(verify_placement(&state).is_ok());
	}

	#[test]
	fn corrupted_grid_is_caught()
	{
		let mut state = two_tile_state();
		// Directly corrupt the grid without going through `assign`/`move_node`, simulating a bug.
		state.grid.set_for_test(Location::new(0,0),None);
		let result = verify_placement(&state);
		assert!(matches!(result,Err(Error::PlacementInconsistency{..})));
	}
}
