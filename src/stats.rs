//! Simulation statistics collection and reporting.

/// Counters accumulated by the processor as it ticks.
#[derive(Default)]
pub struct SimStats {
    pub cycles: u64,
    pub stalls_data: u64,
    pub stalls_mem: u64,
    pub branch_flushes: u64,
}

impl SimStats {
    /// Prints a formatted summary of the counters.
    pub fn print(&self) {
        let cyc = if self.cycles == 0 { 1 } else { self.cycles };
        println!("----------------------------------------");
        println!("PIPELINE SIMULATION STATISTICS");
        println!("----------------------------------------");
        println!("sim_cycles               {}", self.cycles);
        println!(
            "stalls.data              {} ({:.2}%)",
            self.stalls_data,
            (self.stalls_data as f64 / cyc as f64) * 100.0
        );
        println!(
            "stalls.memory            {} ({:.2}%)",
            self.stalls_mem,
            (self.stalls_mem as f64 / cyc as f64) * 100.0
        );
        println!(
            "flushes.branch           {} ({:.2}%)",
            self.branch_flushes,
            (self.branch_flushes as f64 / cyc as f64) * 100.0
        );
        println!("----------------------------------------");
    }
}
