/*!

The `Map` entity: pairs a frozen [`TopLevel`]+[`Taskgraph`] with whatever
placement and routing results have been produced for them, plus the
metrics §6 asks every run to attach. This is the one object `place` and
`route` both take and return.

*/

use std::collections::{BTreeMap,HashSet};
use std::time::Instant;
use crate::arch::{Path,TopLevel};
use crate::error::Error;
use crate::placement::sa::{self,PlaceOptions,PlacementReport};
use crate::placement::state::PlacementState;
use crate::quantify::Quantifiable;
use crate::routing::channels::{self,RoutingChannel};
use crate::routing::graph::RoutingGraph;
use crate::routing::pathfinder::{self,RoutingOptions,RoutingReport};
use crate::ruleset::RuleSet;
use crate::taskgraph::Taskgraph;
use crate::verify;

/// One attached metric value; §6 lists both scalar counters (`usize`/`f64`) and a pass/fail flag.
#[derive(Clone,Debug,PartialEq)]
pub enum MetricValue
{
	Count(usize),
	Seconds(f64),
	Bytes(usize),
	Scalar(f64),
	Flag(bool),
}

/// Everything produced by `place`/`route` for one architecture+task-graph pair.
pub struct Map
{
	pub top: TopLevel,
	pub taskgraph: Taskgraph,
	pub placement: Option<PlacementState>,
	/// `node_name -> path`, transcribed from `placement` once it exists.
	pub placements: Vec<Option<Path>>,
	pub routing_graph: Option<RoutingGraph>,
	pub routing_channels: Vec<RoutingChannel>,
	pub routes: Vec<HashSet<usize>>,
	pub metrics: BTreeMap<String,MetricValue>,
}

impl Map
{
	pub fn new(top: TopLevel, taskgraph: Taskgraph) -> Map
	{
		let n = taskgraph.num_nodes();
		Map{ top, taskgraph, placement: None, placements: vec![None;n], routing_graph: None, routing_channels: Vec::new(), routes: Vec::new(), metrics: BTreeMap::new() }
	}
	/// Convenience wrapper running both placement and routing verifiers against whatever state is
	/// currently attached (§SPEC_FULL B.3). Returns `Ok(())` if both are absent (nothing to check
	/// yet) or both pass.
	pub fn verify(&self, rules: &dyn RuleSet) -> Result<(),Error>
	{
		if let Some(state) = &self.placement
		{
			verify::verify_placement(state)?;
		}
		if let Some(graph) = &self.routing_graph
		{
			verify::verify_routing(graph,&self.routing_channels,&self.routes,rules)?;
		}
		Ok(())
	}
}

/// Build a [`PlacementState`] from `map`'s own architecture and task graph (Components A-C), then
/// anneal and transcribe it via [`place_with_state`] — the self-sufficient entry point of §6:
/// `place(map, options)` needs nothing beyond a `Map` and a rule set.
pub fn place(map: &mut Map, rules: &dyn RuleSet, options: PlaceOptions) -> Result<(),Error>
{
	let struct_start = Instant::now();
	let state = PlacementState::build(&map.top,&map.taskgraph,rules,&options)?;
	let struct_elapsed = struct_start.elapsed().as_secs_f64();
	let struct_bytes = state.total_memory();
	map.metrics.insert("placement_struct_time".to_string(),MetricValue::Seconds(struct_elapsed));
	map.metrics.insert("placement_struct_bytes".to_string(),MetricValue::Bytes(struct_bytes));
	place_with_state(map,state,rules,options)
}

/// Anneal an already-built [`PlacementState`] (Component F), transcribe the result back onto
/// `map`, and attach the placement metrics of §6. Exposed separately from [`place`] for callers
/// that need to hand-build or inspect the state before annealing (e.g. to override
/// `address_data`, or to reuse a state across repeated runs).
pub fn place_with_state(map: &mut Map, mut state: PlacementState, rules: &dyn RuleSet, mut options: PlaceOptions) -> Result<(),Error>
{
	let run_start = Instant::now();
	sa::initial_placement(&mut state)?;
	let report: PlacementReport = sa::run(&mut state,&mut options);
	let run_elapsed = run_start.elapsed().as_secs_f64();
	verify::verify_placement(&state)?;

	for node_index in 0..state.nodes.len()
	{
		let location = state.location(node_index);
		let slot_path = state.path_table.slots_at(location.address_index)[location.slot_index].clone();
		map.placements[node_index] = Some(slot_path);
	}
	map.metrics.insert("placement_objective".to_string(),MetricValue::Scalar(report.objective));
	map.metrics.insert("placement_time".to_string(),MetricValue::Seconds(run_elapsed));
	map.metrics.insert("placement_bytes".to_string(),MetricValue::Bytes(state.total_memory()));
	let _ = rules;
	map.placement = Some(state);
	Ok(())
}

/// Build the routing graph and channels (Components G-H), negotiate congestion to a fixed point
/// (Component I), transcribe routes back onto `map`, and attach the routing metrics of §6.
pub fn route(map: &mut Map, rules: &dyn RuleSet, options: RoutingOptions) -> Result<(),Error>
{
	let placements: Vec<Path> = map.placements.iter()
		.map(|p|p.clone().expect("every node must be placed before routing"))
		.collect();
	let struct_start = Instant::now();
	let mut graph = RoutingGraph::build(&map.top,rules);
	let channels = channels::build_channels(&map.taskgraph,&placements,&map.top,&graph,rules);
	let struct_elapsed = struct_start.elapsed().as_secs_f64();
	map.metrics.insert("routing_struct_time".to_string(),MetricValue::Seconds(struct_elapsed));
	map.metrics.insert("routing_struct_bytes".to_string(),MetricValue::Bytes(graph.total_memory()+channels.total_memory()));

	let run_start = Instant::now();
	let result = pathfinder::route(&mut graph,&channels,rules,&options);
	let run_elapsed = run_start.elapsed().as_secs_f64();
	let report: RoutingReport = match result
	{
		Ok(report) => report,
		Err(error) =>
		{
			map.metrics.insert("routing_passed".to_string(),MetricValue::Flag(false));
			map.metrics.insert("routing_error".to_string(),MetricValue::Flag(true));
			map.metrics.insert("routing_time".to_string(),MetricValue::Seconds(run_elapsed));
			map.metrics.insert("routing_bytes".to_string(),MetricValue::Bytes(graph.total_memory()));
			return Err(error);
		},
	};

	map.metrics.insert("routing_passed".to_string(),MetricValue::Flag(report.passed));
	map.metrics.insert("routing_error".to_string(),MetricValue::Flag(!report.passed));
	map.metrics.insert("routing_global_links".to_string(),MetricValue::Count(report.global_links));
	map.metrics.insert("routing_time".to_string(),MetricValue::Seconds(run_elapsed));
	map.metrics.insert("routing_bytes".to_string(),MetricValue::Bytes(graph.total_memory()));
	map.routes = report.routes;
	map.routing_channels = channels;
	map.routing_graph = Some(graph);

	if !report.passed
	{
		let graph = map.routing_graph.as_ref().unwrap();
		let overused = (0..graph.num_vertices()).filter(|&v|graph.link(v).is_overused()).count();
		return Err(Error::RoutingCongestion{ iterations: report.iterations, overused_vertices: overused });
	}
	Ok(())
}
