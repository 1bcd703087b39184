use vulsim::driver;
use vulsim_utils::VulResult;

fn main() -> VulResult<()> {
    driver::run_compiler()
}
