/*!

Component F: the simulated-annealing driver. A WARM/RUN/DONE phase state
machine that drives [`crate::placement::state::PlacementState`] through
[`crate::placement::movegen::MoveGenerator`] proposals, accepting or
rejecting each trial under the Metropolis criterion and adapting
temperature and move radius between rounds via pluggable schedules.

*/

use rand::Rng;
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::placement::cost::CostModel;
use crate::placement::movegen::{CachedMoveGenerator,MoveGenerator};
use crate::placement::state::{Location,PlacementState};

/// `T ← cool(T, accept_ratio)`. Default: `α = 0.5 + 0.44·accept_ratio` clamped to `[0.5, 0.94]`.
pub trait Cooler
{
	fn cool(&self, temperature: f64, accept_ratio: f64) -> f64;
}

/// `r ← limit(r, accept_ratio, max_hop)`. Default scales toward a target acceptance of 0.44.
pub trait Limiter
{
	fn limit(&self, radius: i64, accept_ratio: f64, max_hop: i64) -> i64;
}

/// `T ← warm(T)`, invoked repeatedly until the empirical acceptance ratio clears the warm-up
/// target; geometric growth by default.
pub trait Warmer
{
	fn warm(&self, temperature: f64) -> f64;
}

/// `done(round, temperature, accept_ratio) -> bool`; exit the RUN phase when true.
pub trait Doner
{
	fn done(&self, round: usize, temperature: f64, accept_ratio: f64) -> bool;
}

#[derive(Clone,Copy,Debug)]
pub struct DefaultCooler;
impl Cooler for DefaultCooler
{
	fn cool(&self, temperature: f64, accept_ratio: f64) -> f64
	{
		let alpha = (0.5+0.44*accept_ratio).clamp(0.5,0.94);
		temperature*alpha
	}
}

#[derive(Clone,Copy,Debug)]
pub struct DefaultLimiter;
impl Limiter for DefaultLimiter
{
	fn limit(&self, radius: i64, accept_ratio: f64, max_hop: i64) -> i64
	{
		let scaled = (radius as f64*(1.0-0.44+accept_ratio)).round() as i64;
		scaled.clamp(1,max_hop.max(1))
	}
}

#[derive(Clone,Copy,Debug)]
pub struct DefaultWarmer;
impl Warmer for DefaultWarmer
{
	fn warm(&self, temperature: f64) -> f64
	{
		temperature*2.0
	}
}

/// Exits after `max_rounds` RUN rounds, or earlier once `temperature` drops below
/// `min_temperature`.
#[derive(Clone,Copy,Debug)]
pub struct DefaultDoner
{
	pub max_rounds: usize,
	pub min_temperature: f64,
}
impl Doner for DefaultDoner
{
	fn done(&self, round: usize, temperature: f64, _accept_ratio: f64) -> bool
	{
		round>=self.max_rounds || temperature<self.min_temperature
	}
}

/// Tunables for [`run`], mirroring `place`'s options (§6) minus the architecture/taskgraph
/// construction parameters, which live on `PlacementState` itself.
pub struct PlaceOptions
{
	pub seed: u64,
	pub move_attempts: usize,
	pub initial_temperature: f64,
	pub warm_up_target: f64,
	pub max_hop: i64,
	/// Use the Address-only representation when the architecture's map table collapses to one
	/// mappable slot per tile. When `false`, `PlacementState::build` pads the grid to at least two
	/// slots per address even on an otherwise flat architecture, forcing the general (address,
	/// slot) bookkeeping path regardless of whether the architecture could collapse it (§6).
	pub enable_flatness: bool,
	/// Populate `PlacementState::address_data` with a per-address cost table at construction time
	/// (initially all zero; a caller can overwrite it before calling `run`) (§6).
	pub enable_address: bool,
	pub warmer: Box<dyn Warmer>,
	pub cooler: Box<dyn Cooler>,
	pub limiter: Box<dyn Limiter>,
	pub doner: Box<dyn Doner>,
	pub movegen: Box<dyn MoveGenerator>,
	pub cost_model: CostModel,
}

impl Default for PlaceOptions
{
	fn default() -> PlaceOptions
	{
		PlaceOptions{
			seed: 0,
			move_attempts: 20000,
			initial_temperature: 1.0,
			warm_up_target: 0.96,
			max_hop: 64,
			enable_flatness: true,
			enable_address: false,
			warmer: Box::new(DefaultWarmer),
			cooler: Box::new(DefaultCooler),
			limiter: Box::new(DefaultLimiter),
			doner: Box::new(DefaultDoner{ max_rounds: 10000, min_temperature: 1e-6 }),
			movegen: Box::new(CachedMoveGenerator::new()),
			cost_model: CostModel::default(),
		}
	}
}

/// Outcome statistics of a completed annealing run, folded into the map's metrics by the caller.
#[derive(Clone,Copy,Debug,Default)]
pub struct PlacementReport
{
	pub rounds: usize,
	pub final_temperature: f64,
	pub final_radius: i64,
	pub final_accept_ratio: f64,
	pub objective: f64,
}

/// Drive `state` through WARM, RUN, and DONE; returns a summary report. Deterministic: a fixed
/// seed plus fixed inputs reproduces an identical trajectory, since `options.seed` governs the
/// single `StdRng` used for every random draw (node sampling, move proposals, acceptance).
pub fn run(state: &mut PlacementState, options: &mut PlaceOptions) -> PlacementReport
{
	let mut rng = StdRng::seed_from_u64(options.seed);
	let mut temperature = options.initial_temperature;
	let mut radius = options.max_hop.max(1);

	// WARM: grow temperature geometrically until a sampled window of move_attempts trials clears
	// the acceptance target.
	loop
	{
		let ratio = sample_round(state,options,&mut rng,temperature,radius).accept_ratio;
		if ratio>=options.warm_up_target || temperature>1e300
		{
			break;
		}
		temperature = options.warmer.warm(temperature);
	}

	// RUN: rounds of move_attempts successful moves, cooling and limiting between rounds.
	let mut round = 0;
	let mut last_ratio = 0.0;
	loop
	{
		let outcome = sample_round(state,options,&mut rng,temperature,radius);
		last_ratio = outcome.accept_ratio;
		round += 1;
		if options.doner.done(round,temperature,last_ratio)
		{
			break;
		}
		temperature = options.cooler.cool(temperature,last_ratio);
		radius = options.limiter.limit(radius,last_ratio,options.max_hop);
	}

	let objective: f64 = (0..state.nodes.len()).map(|i|options.cost_model.node_cost(state,i)).sum::<f64>()/2.0
		+ options.cost_model.aux_cost(state);

	PlacementReport{ rounds: round, final_temperature: temperature, final_radius: radius, final_accept_ratio: last_ratio, objective }
}

struct RoundOutcome
{
	accept_ratio: f64,
}

/// Perform up to `move_attempts` *successful* trials (capped at `move_attempts*4` total attempts
/// to avoid an infinite loop should the move generator run dry), returning the observed
/// acceptance ratio over all attempts made.
fn sample_round(state: &mut PlacementState, options: &mut PlaceOptions, rng: &mut StdRng, temperature: f64, radius: i64) -> RoundOutcome
{
	let mut accepted = 0usize;
	let mut attempted = 0usize;
	let attempt_cap = options.move_attempts.saturating_mul(4).max(1);
	while accepted<options.move_attempts && attempted<attempt_cap
	{
		attempted += 1;
		if try_trial(state,options,rng,temperature,radius)
		{
			accepted += 1;
		}
	}
	RoundOutcome{ accept_ratio: if attempted==0 { 0.0 } else { accepted as f64/attempted as f64 } }
}

/// One SA trial per spec §4.F: sample a node, ask the move generator for a target, compute the
/// incremental cost delta for a move or a swap, and accept under the Metropolis criterion.
/// Returns whether the trial was accepted (kept).
fn try_trial(state: &mut PlacementState, options: &mut PlaceOptions, rng: &mut StdRng, temperature: f64, radius: i64) -> bool
{
	if state.nodes.is_empty()
	{
		return false;
	}
	let node_index = rng.gen_range(0..state.nodes.len());
	let Some(target) = options.movegen.propose(state,rng,node_index,radius) else { return false };
	let origin = state.location(node_index);
	if origin==target
	{
		return false;
	}

	let occupant = state.grid.occupant(target);
	let accept = match occupant
	{
		None =>
		{
			let before = options.cost_model.node_cost(state,node_index);
			state.move_node(node_index,target);
			let after = options.cost_model.node_cost(state,node_index);
			let delta = after-before;
			if metropolis_accept(rng,delta,temperature)
			{
				true
			}
			else
			{
				state.move_node(node_index,origin);
				false
			}
		},
		Some(other) =>
		{
			if other==node_index
			{
				return false;
			}
			if !state.is_legal(node_index,target) || !state.is_legal(other,origin)
			{
				return false;
			}
			let before = options.cost_model.node_pair_cost(state,node_index,other);
			state.swap(node_index,other);
			let after = options.cost_model.node_pair_cost(state,node_index,other);
			let delta = after-before;
			if metropolis_accept(rng,delta,temperature)
			{
				true
			}
			else
			{
				state.swap(node_index,other);
				false
			}
		},
	};
	accept
}

fn metropolis_accept(rng: &mut StdRng, delta: f64, temperature: f64) -> bool
{
	if delta<=0.0
	{
		return true;
	}
	if temperature<=0.0
	{
		return false;
	}
	rng.gen::<f64>()<(-delta/temperature).exp()
}

/// Seat every node of `state` into a legal, mutually-exclusive location before annealing begins,
/// in class order so special classes (the most constrained) are seated first. Returns an error
/// naming the first node that could not be seated (`PlacementInfeasible`, spec §7).
pub fn initial_placement(state: &mut PlacementState) -> Result<(),crate::error::Error>
{
	let mut order: Vec<usize> = (0..state.nodes.len()).collect();
	order.sort_by_key(|&i|match state.get_class(i) { crate::maptable::ClassId::Special(_) => 0, crate::maptable::ClassId::Normal(_) => 1 });
	for node_index in order
	{
		if state.grid.occupant(state.location(node_index)).is_some() && state.is_legal(node_index,state.location(node_index))
		{
			continue;
		}
		let class = state.get_class(node_index);
		let space_size = state.path_table.address_space().size();
		let mut seated = false;
		'search: for address_index in 0..space_size
		{
			for &slot_index in state.map_table.valid_slots(class,address_index)
			{
				let candidate = Location::new(address_index,slot_index);
				if state.grid.occupant(candidate).is_none()
				{
					state.assign(node_index,candidate);
					seated = true;
					break 'search;
				}
			}
		}
		if !seated
		{
			return Err(crate::error::Error::PlacementInfeasible(format!("no legal empty slot remains for node index {node_index}")));
		}
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
	use crate::placement::state::{SaChannel,SaNode};
	use crate::ruleset::DefaultRuleSet;
	use crate::taskgraph::{Taskgraph,TaskgraphEdge,TaskgraphNode};

	fn chain_state(n: usize) -> PlacementState
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
		let names: Vec<String> = (0..n).map(|i|format!("t{i}")).collect();
		let nodes: Vec<TaskgraphNode> = names.iter().map(TaskgraphNode::new).collect();
		let edges: Vec<TaskgraphEdge> = (0..n-1).map(|i|TaskgraphEdge::point_to_point(names[i].clone(),names[i+1].clone())).collect();
		let taskgraph = Taskgraph::build(nodes,edges).unwrap();
		let classes = ClassAssignment::build(&taskgraph,&rules);
		let map_table = MapTable::build(&top,&taskgraph,&path_table,&classes,&rules).unwrap();
		let mut neighbours = vec![Vec::new();n];
		for i in 0..n-1
		{
			neighbours[i].push(i+1);
			neighbours[i+1].push(i);
		}
		let distance = DistanceLut::from_neighbours(path_table.address_space().clone(),&neighbours);
		let sa_nodes: Vec<SaNode> = (0..n).map(|i|SaNode{
			location: Location::new(i,0),
			class: ClassId::Normal(0),
			out_channels: if i+1<n { vec![i] } else { vec![] },
			in_channels: if i>0 { vec![i-1] } else { vec![] },
		}).collect();
		let channels = (0..n-1).map(|i|SaChannel::TwoChannel{ src: i, dst: i+1 }).collect();
		PlacementState::new(sa_nodes,channels,map_table,path_table,distance)
	}

	#[test]
	fn two_node_swap_converges_to_direct_distance()
	{
		// Two interchangeable tasks on a 2-address line: any legal placement has the same cost,
		// so the objective must settle at D[0,1] == 1 regardless of which of the two layouts wins.
		let mut state = chain_state(2);
		let mut options = PlaceOptions{
			move_attempts: 50,
			max_hop: 1,
			doner: Box::new(DefaultDoner{ max_rounds: 20, min_temperature: 1e-9 }),
			..PlaceOptions::default()
		};
		let report = run(&mut state,&mut options);
		assert_eq!(report.objective,1.0);
	}

	#[test]
	fn same_seed_reproduces_same_trajectory()
	{
		let mut a = chain_state(6);
		let mut b = chain_state(6);
		let mut options_a = PlaceOptions{ seed: 42, move_attempts: 30, doner: Box::new(DefaultDoner{ max_rounds: 5, min_temperature: 1e-9 }), ..PlaceOptions::default() };
		let mut options_b = PlaceOptions{ seed: 42, move_attempts: 30, doner: Box::new(DefaultDoner{ max_rounds: 5, min_temperature: 1e-9 }), ..PlaceOptions::default() };
		let report_a = run(&mut a,&mut options_a);
		let report_b = run(&mut b,&mut options_b);
		assert_eq!(report_a.objective,report_b.objective);
		let locations_a: Vec<Location> = a.nodes.iter().map(|n|n.location).collect();
		let locations_b: Vec<Location> = b.nodes.iter().map(|n|n.location).collect();
		assert_eq!(locations_a,locations_b);
	}

	#[test]
	fn initial_placement_seats_every_node()
	{
		let mut state = chain_state(4);
		// Scramble to an invalid/self-colliding state by leaving it as-is; initial_placement must
		// be a no-op here since `chain_state` already seats nodes uniquely and legally.
		initial_placement(&mut state).unwrap();
		let mut seen = std::collections::HashSet::new();
		for node in &state.nodes
		{
			assert!(seen.insert(node.location));
		}
	}

	fn flat_chain_top(n: usize) -> (TopLevel,Taskgraph)
	{
		let mut top = TopLevel::new("top",AddressSpace::new(vec![n as i64]));
		for address in top.address_space().iter().collect::<Vec<_>>()
		{
			let mut tile = Component::new("tile").with_primitive("tile");
			tile.add_port(Port::new("p",Direction::Input)).unwrap();
			top.set_tile(address,tile).unwrap();
		}
		let names: Vec<String> = (0..n).map(|i|format!("t{i}")).collect();
		let nodes: Vec<TaskgraphNode> = names.iter().map(TaskgraphNode::new).collect();
		let taskgraph = Taskgraph::build(nodes,vec![]).unwrap();
		(top,taskgraph)
	}

	#[test]
	fn disabling_flatness_pads_the_grid_without_changing_legality()
	{
		let (top,taskgraph) = flat_chain_top(3);
		let rules = DefaultRuleSet;
		let flat_options = PlaceOptions::default();
		let non_flat_options = PlaceOptions{ enable_flatness: false, ..PlaceOptions::default() };
		let flat_state = PlacementState::build(&top,&taskgraph,&rules,&flat_options).unwrap();
		let non_flat_state = PlacementState::build(&top,&taskgraph,&rules,&non_flat_options).unwrap();
		assert_eq!(flat_state.grid.slots_per_address(),1);
		assert_eq!(non_flat_state.grid.slots_per_address(),2);
		assert!(flat_state.map_table.is_flat());
		// The padded phantom slot is never legal, so the reachable placement space is identical.
		for address_index in 0..3
		{
			assert_eq!(flat_state.map_table.valid_slots(ClassId::Normal(0),address_index),non_flat_state.map_table.valid_slots(ClassId::Normal(0),address_index));
		}
	}

	#[test]
	fn enable_address_populates_a_zeroed_table_that_a_caller_can_override()
	{
		let (top,_) = flat_chain_top(3);
		let taskgraph = Taskgraph::build(vec![TaskgraphNode::new("only")],vec![]).unwrap();
		let rules = DefaultRuleSet;
		let options = PlaceOptions{ enable_address: true, ..PlaceOptions::default() };
		let mut state = PlacementState::build(&top,&taskgraph,&rules,&options).unwrap();
		assert_eq!(state.address_data,Some(vec![0.0,0.0,0.0]));

		state.address_data = Some(vec![5.0,1.0,5.0]);
		initial_placement(&mut state).unwrap();
		let mut run_options = PlaceOptions{ move_attempts: 200, max_hop: 2, doner: Box::new(DefaultDoner{ max_rounds: 200, min_temperature: 1e-12 }), ..PlaceOptions::default() };
		run(&mut state,&mut run_options);
		assert_eq!(state.location(0).address_index,1,"the sole node must settle on the cheapest address");
	}
}
