pub mod balancer;
pub mod blockchain;
pub mod cli;
pub mod observe;
pub mod pool_math;
pub mod subgraph;
pub mod uniswap;
