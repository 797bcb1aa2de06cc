mod support;

mod ecn_flags;
mod queues;
mod routing;
mod scenario;
mod sim_time;
mod topologies;
