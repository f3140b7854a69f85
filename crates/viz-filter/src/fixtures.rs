use viz_data::{Cell, Column, ColumnType, DataTable, Value};

/// Four sales rows: Portugal/Car, Portugal/Bike, Ireland/Car, Spain/Bike
pub(crate) fn sales_table() -> DataTable {
    let mut table = DataTable::new(vec![
        Column::new("country", ColumnType::String).key(),
        Column::new("product", ColumnType::String).key(),
        Column::new("sales", ColumnType::Number),
    ])
    .unwrap();
    table.add_values(vec![Value::from("Portugal"), Value::from("Car"), Value::from(12000)]).unwrap();
    table
        .add_row(vec![Cell::new("Portugal"), Cell::new("Bike"), Cell::labeled(1500, "1.5k")])
        .unwrap();
    table.add_values(vec![Value::from("Ireland"), Value::from("Car"), Value::from(6000)]).unwrap();
    table.add_values(vec![Value::from("Spain"), Value::from("Bike"), Value::from(900)]).unwrap();
    table
}
