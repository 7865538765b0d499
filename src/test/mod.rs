mod ack_timeout;
mod medium;
mod sim_time;
mod support;
