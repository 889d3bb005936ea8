/*!

Component E: the cost model. All four cost queries the SA driver's hot
loop needs — channel, address, node, and node-pair cost — live here so
that a trial move or swap never has to touch anything outside
[`crate::placement::state::PlacementState`] plus this module.

*/

use itertools::Itertools;
use crate::placement::state::{PlacementState,SaChannel};

/// How a `MultiChannel`'s cost is computed from its endpoint addresses.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum ChannelCostKind
{
	/// Sum of pairwise hop distances over the Cartesian product of sources and sinks (spec §4.E
	/// default): an HPWL approximation that is exact for `TwoChannel`.
	SummedPairwise,
	/// Half-perimeter wire length: the hop-distance diameter of the bounding box spanned by every
	/// endpoint address, approximated here as the distance between the componentwise-min and
	/// componentwise-max addresses of the channel's endpoints (supplemental, §SPEC_FULL B.1).
	BoundingBox,
}

impl Default for ChannelCostKind
{
	fn default() -> Self
	{
		ChannelCostKind::SummedPairwise
	}
}

/// The cost model: a channel-cost strategy plus the optional address/aux cost hooks carried on
/// `PlacementState`.
#[derive(Clone,Copy,Debug,Default)]
pub struct CostModel
{
	pub channel_cost_kind: ChannelCostKind,
}

impl CostModel
{
	/// Cost of a single channel given its current placement.
	pub fn channel_cost(&self, state: &PlacementState, channel: &SaChannel) -> f64
	{
		match channel
		{
			SaChannel::TwoChannel{src,dst} =>
			{
				let source_address = state.location(*src).address_index;
				let dest_address = state.location(*dst).address_index;
				state.distance.distance_by_index(source_address,dest_address) as f64
			},
			SaChannel::MultiChannel{srcs,sinks} => match self.channel_cost_kind
			{
				ChannelCostKind::SummedPairwise => srcs.iter().cartesian_product(sinks.iter())
					.map(|(&s,&d)|
					{
						let sa = state.location(s).address_index;
						let da = state.location(d).address_index;
						state.distance.distance_by_index(sa,da) as f64
					})
					.sum(),
				ChannelCostKind::BoundingBox =>
				{
					let addresses = state.path_table.address_space();
					let mut min_address: Option<crate::address::Address> = None;
					let mut max_address: Option<crate::address::Address> = None;
					for &node in srcs.iter().chain(sinks.iter())
					{
						let address = addresses.unpack(state.location(node).address_index);
						min_address = Some(match min_address
						{
							None => address.clone(),
							Some(current) => current.componentwise_min(&address),
						});
						max_address = Some(match max_address
						{
							None => address,
							Some(current) => current.componentwise_max(&address),
						});
					}
					match (min_address,max_address)
					{
						(Some(lo),Some(hi)) => state.distance.distance(&lo,&hi) as f64,
						_ => 0.0,
					}
				},
			},
		}
	}
	/// Optional per-location penalty; zero unless `address_data` has been populated.
	pub fn address_cost(&self, state: &PlacementState, node_index: usize) -> f64
	{
		match &state.address_data
		{
			Some(data) => data[state.location(node_index).address_index],
			None => 0.0,
		}
	}
	/// The global aux cost, only meaningful in full-map contexts; never called from the
	/// incremental move/swap delta computation.
	pub fn aux_cost(&self, state: &PlacementState) -> f64
	{
		match &state.aux
		{
			Some(f) => f(state),
			None => 0.0,
		}
	}
	/// Full cost of one node: its outgoing and incoming channel costs plus its address cost.
	/// `aux_cost` is deliberately excluded — callers add it once for the whole map, not once per
	/// node, to avoid the O(n) aux recomputation happening inside the O(1) trial loop.
	pub fn node_cost(&self, state: &PlacementState, node_index: usize) -> f64
	{
		let node = &state.nodes[node_index];
		let outgoing: f64 = node.out_channels.iter().map(|&c|self.channel_cost(state,&state.channels[c])).sum();
		let incoming: f64 = node.in_channels.iter().map(|&c|self.channel_cost(state,&state.channels[c])).sum();
		outgoing+incoming+self.address_cost(state,node_index)
	}
	/// Cost of node `i` plus cost of node `j`, omitting from `j`'s tally any channel that directly
	/// connects `i` and `j` — the contract required for correct swap deltas (§4.E): without this,
	/// a channel between the two swapped nodes would be counted twice.
	pub fn node_pair_cost(&self, state: &PlacementState, i: usize, j: usize) -> f64
	{
		let cost_i = self.node_cost(state,i);
		let node_j = &state.nodes[j];
		let shared: std::collections::HashSet<usize> = node_j.out_channels.iter().chain(node_j.in_channels.iter())
			.filter(|&&c|channel_touches(&state.channels[c],i))
			.copied()
			.collect();
		let outgoing_j: f64 = node_j.out_channels.iter().filter(|c|!shared.contains(c)).map(|&c|self.channel_cost(state,&state.channels[c])).sum();
		let incoming_j: f64 = node_j.in_channels.iter().filter(|c|!shared.contains(c)).map(|&c|self.channel_cost(state,&state.channels[c])).sum();
		cost_i+outgoing_j+incoming_j+self.address_cost(state,j)
	}
}

fn channel_touches(channel: &SaChannel, node_index: usize) -> bool
{
	channel.endpoints().contains(&node_index)
}
